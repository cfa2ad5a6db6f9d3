//! Part models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stock at or below this count (and above zero) is reported as low
pub const LOW_STOCK_THRESHOLD: i32 = 10;

/// A stocked part with its running stock counter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Part {
    pub id: Uuid,
    /// Unique human-readable part number, printed on the shelf label
    pub code: String,
    pub name: String,
    pub stock: i32,
    /// Stock the part was registered with; movements are applied on top
    pub opening_stock: i32,
    #[serde(flatten)]
    pub attributes: PartAttributes,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Descriptive part data; none of it affects stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartAttributes {
    #[serde(default)]
    pub customer_code: Option<String>,
    #[serde(default)]
    pub supplier_code: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub variant: Option<String>,
    /// Units per standard box
    #[serde(default = "default_packing")]
    pub standard_packing: i32,
    /// Storage location
    #[serde(default)]
    pub address: Option<String>,
}

impl Default for PartAttributes {
    fn default() -> Self {
        Self {
            customer_code: None,
            supplier_code: None,
            model: None,
            variant: None,
            standard_packing: default_packing(),
            address: None,
        }
    }
}

impl PartAttributes {
    /// Trimmed copy with blank strings dropped
    pub fn normalized(&self) -> Self {
        fn clean(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            customer_code: clean(&self.customer_code),
            supplier_code: clean(&self.supplier_code),
            model: clean(&self.model),
            variant: clean(&self.variant),
            standard_packing: self.standard_packing,
            address: clean(&self.address),
        }
    }
}

impl Part {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.stock)
    }

    /// Whether an operator-scanned label refers to this part.
    /// Surrounding whitespace and letter case are ignored.
    pub fn matches_code(&self, scanned: &str) -> bool {
        normalize_code(&self.code) == normalize_code(scanned)
    }
}

/// Canonical form of a part code for comparisons
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Input for registering a part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPart {
    pub code: String,
    pub name: String,
    /// Opening stock, before any movement exists
    #[serde(default)]
    pub stock: i32,
    #[serde(flatten)]
    pub attributes: PartAttributes,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Replacement for a part's editable fields. Stock is not among them:
/// it only changes through movements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartUpdate {
    pub code: String,
    pub name: String,
    #[serde(flatten)]
    pub attributes: PartAttributes,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

fn default_packing() -> i32 {
    1
}

/// Coarse stock classification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockLevel {
    OutOfStock,
    LowStock,
    InStock,
}

impl StockLevel {
    pub fn classify(stock: i32) -> Self {
        if stock <= 0 {
            StockLevel::OutOfStock
        } else if stock <= LOW_STOCK_THRESHOLD {
            StockLevel::LowStock
        } else {
            StockLevel::InStock
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(code: &str, stock: i32) -> Part {
        Part {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: "Bracket".to_string(),
            stock,
            opening_stock: stock,
            attributes: PartAttributes::default(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn scanned_code_ignores_case_and_padding() {
        let p = part("BRK-001a", 5);
        assert!(p.matches_code("  brk-001A\n"));
        assert!(!p.matches_code("BRK-001"));
    }

    #[test]
    fn stock_levels() {
        assert_eq!(part("A", 0).stock_level(), StockLevel::OutOfStock);
        assert_eq!(part("A", 1).stock_level(), StockLevel::LowStock);
        assert_eq!(part("A", LOW_STOCK_THRESHOLD).stock_level(), StockLevel::LowStock);
        assert_eq!(part("A", LOW_STOCK_THRESHOLD + 1).stock_level(), StockLevel::InStock);
    }

    #[test]
    fn attributes_drop_blank_strings() {
        let attributes = PartAttributes {
            model: Some("  NMAX ".to_string()),
            variant: Some("   ".to_string()),
            ..Default::default()
        }
        .normalized();
        assert_eq!(attributes.model.as_deref(), Some("NMAX"));
        assert_eq!(attributes.variant, None);
        assert_eq!(attributes.standard_packing, 1);
    }
}

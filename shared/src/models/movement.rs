//! Stock movement models
//!
//! A movement is the immutable record of one stock change. Its
//! before/after pair is computed once, checked, and never edited; undoing a
//! movement deletes it and applies the inverse change to the part.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::DocumentKind;
use crate::error::{DomainError, DomainResult};

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
        }
    }

    pub fn sign(&self) -> i32 {
        match self {
            MovementType::In => 1,
            MovementType::Out => -1,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in" => Ok(MovementType::In),
            "out" => Ok(MovementType::Out),
            other => Err(DomainError::validation(
                "type",
                format!("unknown movement type '{other}'"),
            )),
        }
    }
}

/// Tagged reference from a movement to the document that caused it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id: Uuid,
}

impl DocumentRef {
    pub fn new(kind: DocumentKind, id: Uuid) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A checked stock transition for a single part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    pub stock_before: i32,
    pub movement_type: MovementType,
    pub qty: i32,
    pub stock_after: i32,
}

impl StockChange {
    /// Compute the transition of `stock_before` by `qty` units in the given
    /// direction. Outgoing changes may never drive stock below zero.
    pub fn apply(
        part_code: &str,
        stock_before: i32,
        movement_type: MovementType,
        qty: i32,
    ) -> DomainResult<Self> {
        if qty <= 0 {
            return Err(DomainError::InvalidQuantity { qty });
        }

        let stock_after = match movement_type {
            MovementType::In => stock_before
                .checked_add(qty)
                .ok_or_else(|| DomainError::StockOverflow {
                    part_code: part_code.to_string(),
                })?,
            MovementType::Out => {
                if qty > stock_before {
                    return Err(DomainError::InsufficientStock {
                        part_code: part_code.to_string(),
                        available: stock_before,
                        required: qty,
                    });
                }
                stock_before - qty
            }
        };

        Ok(Self {
            stock_before,
            movement_type,
            qty,
            stock_after,
        })
    }

    /// Same as [`StockChange::apply`] but driven by a signed delta
    pub fn from_delta(part_code: &str, stock_before: i32, delta: i32) -> DomainResult<Self> {
        let movement_type = if delta >= 0 {
            MovementType::In
        } else {
            MovementType::Out
        };
        let qty = delta
            .checked_abs()
            .ok_or_else(|| DomainError::StockOverflow {
                part_code: part_code.to_string(),
            })?;
        Self::apply(part_code, stock_before, movement_type, qty)
    }

    pub fn delta(&self) -> i32 {
        self.movement_type.sign() * self.qty
    }

    /// Check that the recorded pair agrees with the direction and quantity
    pub fn verify(&self) -> DomainResult<()> {
        let expected = self.stock_before.checked_add(self.delta());
        if self.qty <= 0 || self.stock_after < 0 || expected != Some(self.stock_after) {
            return Err(DomainError::InconsistentMovement {
                movement_type: self.movement_type,
                stock_before: self.stock_before,
                qty: self.qty,
                stock_after: self.stock_after,
            });
        }
        Ok(())
    }
}

/// A persisted movement row
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Movement {
    pub id: Uuid,
    pub part_id: Uuid,
    pub stock_before: i32,
    pub movement_type: MovementType,
    pub qty: i32,
    pub stock_after: i32,
    pub document_kind: DocumentKind,
    pub document_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Movement {
    pub fn document(&self) -> DocumentRef {
        DocumentRef::new(self.document_kind, self.document_id)
    }

    pub fn change(&self) -> StockChange {
        StockChange {
            stock_before: self.stock_before,
            movement_type: self.movement_type,
            qty: self.qty,
            stock_after: self.stock_after,
        }
    }
}

/// A movement ready to be appended to the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub part_id: Uuid,
    pub change: StockChange,
    pub document: DocumentRef,
}

impl NewMovement {
    pub fn new(part_id: Uuid, change: StockChange, document: DocumentRef) -> DomainResult<Self> {
        change.verify()?;
        Ok(Self {
            part_id,
            change,
            document,
        })
    }
}

/// Filters for listing movements, newest first
#[derive(Debug, Clone, Default)]
pub struct MovementFilter {
    pub movement_type: Option<MovementType>,
    /// Case-insensitive substring match on the part code
    pub part_code: Option<String>,
    pub created: crate::types::DateRange,
    pub limit: Option<u32>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement, part_code: &str) -> bool {
        if self.movement_type.is_some_and(|t| t != movement.movement_type) {
            return false;
        }
        if let Some(needle) = &self.part_code {
            if !part_code.to_uppercase().contains(&needle.trim().to_uppercase()) {
                return false;
            }
        }
        self.created.contains(movement.created_at.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn outgoing_to_exactly_zero_is_allowed() {
        let change = StockChange::apply("P-1", 20, MovementType::Out, 20).unwrap();
        assert_eq!(change.stock_after, 0);
    }

    #[test]
    fn outgoing_beyond_stock_is_rejected() {
        let err = StockChange::apply("P-1", 20, MovementType::Out, 21).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                part_code: "P-1".to_string(),
                available: 20,
                required: 21,
            }
        );
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(matches!(
            StockChange::apply("P-1", 5, MovementType::In, 0),
            Err(DomainError::InvalidQuantity { qty: 0 })
        ));
    }

    #[test]
    fn incoming_overflow_is_reported() {
        assert!(matches!(
            StockChange::apply("P-1", i32::MAX, MovementType::In, 1),
            Err(DomainError::StockOverflow { .. })
        ));
    }

    #[test]
    fn negative_delta_is_an_out_movement() {
        let change = StockChange::from_delta("P-1", 50, -20).unwrap();
        assert_eq!(change.movement_type, MovementType::Out);
        assert_eq!(change.qty, 20);
        assert_eq!(change.stock_after, 30);
        assert_eq!(change.delta(), -20);
    }

    #[test]
    fn tampered_pair_fails_verification() {
        let mut change = StockChange::apply("P-1", 50, MovementType::Out, 20).unwrap();
        change.stock_after = 31;
        assert!(matches!(
            change.verify(),
            Err(DomainError::InconsistentMovement { .. })
        ));
    }

    #[test]
    fn movement_type_parses_case_insensitively() {
        assert_eq!("OUT".parse::<MovementType>().unwrap(), MovementType::Out);
        assert!("sideways".parse::<MovementType>().is_err());
    }

    proptest! {
        #[test]
        fn applied_changes_always_verify(
            before in 0i32..100_000,
            qty in 1i32..100_000,
            incoming in any::<bool>(),
        ) {
            let movement_type = if incoming { MovementType::In } else { MovementType::Out };
            match StockChange::apply("P", before, movement_type, qty) {
                Ok(change) => {
                    prop_assert!(change.verify().is_ok());
                    prop_assert!(change.stock_after >= 0);
                    prop_assert_eq!(change.stock_after, before + change.delta());
                }
                Err(DomainError::InsufficientStock { available, required, .. }) => {
                    prop_assert_eq!(movement_type, MovementType::Out);
                    prop_assert!(required > available);
                }
                Err(other) => prop_assert!(false, "unexpected error {other:?}"),
            }
        }

        #[test]
        fn inverse_change_restores_stock(before in 0i32..100_000, qty in 1i32..100_000) {
            let forward = StockChange::apply("P", before, MovementType::In, qty).unwrap();
            let back = StockChange::apply("P", forward.stock_after, MovementType::Out, qty).unwrap();
            prop_assert_eq!(back.stock_after, before);
        }
    }
}

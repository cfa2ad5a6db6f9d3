//! Rules for supplying a request line item from stock

use crate::error::{DomainError, DomainResult};
use crate::models::{normalize_code, LineItem, Part};

/// Checks run, in order, before a request item may be turned into a
/// completed outgoing. `part` must be the locked, current row.
pub fn check_supply(part: &Part, item: &LineItem, scanned_code: &str, qty: i32) -> DomainResult<()> {
    if !part.matches_code(scanned_code) {
        return Err(DomainError::Mismatch {
            expected: normalize_code(&part.code),
            scanned: normalize_code(scanned_code),
        });
    }

    if qty <= 0 {
        return Err(DomainError::InvalidQuantity { qty });
    }

    if qty > item.qty {
        return Err(DomainError::QuantityExceeded {
            requested: item.qty,
            supplied: qty,
        });
    }

    if part.stock < qty {
        return Err(DomainError::InsufficientStock {
            part_code: part.code.clone(),
            available: part.stock,
            required: qty,
        });
    }

    Ok(())
}

/// Notes stamped on the outgoing generated by a supply
pub fn supply_notes(request_number: &str, destination: Option<&str>) -> String {
    match destination {
        Some(destination) => format!("Auto-generated from request #{request_number} - {destination}"),
        None => format!("Auto-generated from request #{request_number}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn part(stock: i32) -> Part {
        Part {
            id: Uuid::new_v4(),
            code: "HX-220".to_string(),
            name: "Hex bolt".to_string(),
            stock,
            opening_stock: stock,
            attributes: crate::models::PartAttributes::default(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(part: &Part, qty: i32) -> LineItem {
        LineItem {
            id: Uuid::new_v4(),
            document_id: Uuid::new_v4(),
            part_id: part.id,
            qty,
            is_urgent: false,
            is_supplied: false,
        }
    }

    #[test]
    fn accepts_matching_scan_within_limits() {
        let p = part(10);
        assert!(check_supply(&p, &item(&p, 10), " hx-220 ", 10).is_ok());
    }

    #[test]
    fn mismatch_is_checked_first() {
        let p = part(0);
        let err = check_supply(&p, &item(&p, 1), "hx-221", 50).unwrap_err();
        assert_eq!(
            err,
            DomainError::Mismatch {
                expected: "HX-220".to_string(),
                scanned: "HX-221".to_string(),
            }
        );
    }

    #[test]
    fn quantity_above_request_is_rejected_before_stock() {
        let p = part(0);
        let err = check_supply(&p, &item(&p, 5), "HX-220", 6).unwrap_err();
        assert_eq!(
            err,
            DomainError::QuantityExceeded {
                requested: 5,
                supplied: 6,
            }
        );
    }

    #[test]
    fn short_stock_is_rejected() {
        let p = part(3);
        let err = check_supply(&p, &item(&p, 5), "HX-220", 4).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock { available: 3, required: 4, .. }
        ));
    }

    #[test]
    fn notes_mention_request_and_destination() {
        assert_eq!(
            supply_notes("17", Some("Line 3")),
            "Auto-generated from request #17 - Line 3"
        );
        assert_eq!(supply_notes("17", None), "Auto-generated from request #17");
    }
}

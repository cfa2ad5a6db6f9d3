//! Payload validation for the Parts Stock Ledger
//!
//! Shape checks run before the lifecycle engine is invoked. Business rules
//! that depend on stored state (stock, editability) live elsewhere.

use std::collections::HashSet;

use crate::error::{DomainError, DomainResult};
use crate::models::{DocumentInput, DocumentKind, NewLineItem, NewPart, PartAttributes, PartUpdate};

pub const MAX_NUMBER_LEN: usize = 64;
pub const MAX_CODE_LEN: usize = 64;
pub const MAX_NOTES_LEN: usize = 2000;

// ============================================================================
// Document Validations
// ============================================================================

/// Validate a create/update payload for the given document kind
pub fn validate_document_input(kind: DocumentKind, input: &DocumentInput) -> DomainResult<()> {
    match input.number.as_deref() {
        Some(number) => validate_document_number(number)?,
        None if kind == DocumentKind::Receiving => {
            return Err(DomainError::validation(
                "number",
                "Receivings require a document number",
            ));
        }
        None => {}
    }

    if let Some(notes) = &input.notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(DomainError::validation("notes", "Notes are too long"));
        }
    }

    validate_items(&input.items)
}

/// Validate a caller-supplied document number
pub fn validate_document_number(number: &str) -> DomainResult<()> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("number", "Document number is required"));
    }
    if trimmed.len() > MAX_NUMBER_LEN {
        return Err(DomainError::validation("number", "Document number is too long"));
    }
    Ok(())
}

/// At least one item, positive quantities, each part at most once
pub fn validate_items(items: &[NewLineItem]) -> DomainResult<()> {
    if items.is_empty() {
        return Err(DomainError::validation("items", "At least one item is required"));
    }

    let mut seen = HashSet::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        if item.qty <= 0 {
            return Err(DomainError::validation(
                format!("items.{index}.qty"),
                "Quantity must be greater than 0",
            ));
        }
        if !seen.insert(item.part_id) {
            return Err(DomainError::validation(
                format!("items.{index}.part_id"),
                "Each part may appear only once per document",
            ));
        }
    }
    Ok(())
}

// ============================================================================
// Part Validations
// ============================================================================

/// Validate a part registration
pub fn validate_new_part(part: &NewPart) -> DomainResult<()> {
    validate_part_identity(&part.code, &part.name)?;
    if part.stock < 0 {
        return Err(DomainError::validation("stock", "Opening stock cannot be negative"));
    }
    validate_part_attributes(&part.attributes)
}

pub fn validate_part_update(update: &PartUpdate) -> DomainResult<()> {
    validate_part_identity(&update.code, &update.name)?;
    validate_part_attributes(&update.attributes)
}

fn validate_part_identity(code: &str, name: &str) -> DomainResult<()> {
    let code = code.trim();
    if code.is_empty() {
        return Err(DomainError::validation("code", "Part number is required"));
    }
    if code.len() > MAX_CODE_LEN {
        return Err(DomainError::validation("code", "Part number is too long"));
    }
    if name.trim().is_empty() {
        return Err(DomainError::validation("name", "Part name is required"));
    }
    Ok(())
}

fn validate_part_attributes(attributes: &PartAttributes) -> DomainResult<()> {
    if attributes.standard_packing < 1 {
        return Err(DomainError::validation(
            "standard_packing",
            "Standard packing must be at least 1",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentStatus;
    use uuid::Uuid;

    fn input(items: Vec<NewLineItem>) -> DocumentInput {
        DocumentInput::new(DocumentStatus::Draft, items)
    }

    #[test]
    fn receivings_need_a_number() {
        let payload = input(vec![NewLineItem::new(Uuid::new_v4(), 1)]);
        assert!(validate_document_input(DocumentKind::Receiving, &payload).is_err());
        assert!(validate_document_input(DocumentKind::Outgoing, &payload).is_ok());
        assert!(validate_document_input(
            DocumentKind::Receiving,
            &payload.with_number("GR-0001")
        )
        .is_ok());
    }

    #[test]
    fn blank_number_is_rejected() {
        assert!(validate_document_number("   ").is_err());
        assert!(validate_document_number(&"9".repeat(MAX_NUMBER_LEN + 1)).is_err());
    }

    #[test]
    fn empty_item_list_is_rejected() {
        assert!(validate_items(&[]).is_err());
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let err = validate_items(&[NewLineItem::new(Uuid::new_v4(), 0)]).unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("items.0.qty", "Quantity must be greater than 0")
        );
    }

    #[test]
    fn duplicate_parts_are_rejected() {
        let part = Uuid::new_v4();
        let items = [NewLineItem::new(part, 1), NewLineItem::new(part, 2)];
        assert!(matches!(
            validate_items(&items),
            Err(DomainError::Validation { field, .. }) if field == "items.1.part_id"
        ));
    }

    #[test]
    fn part_registration_rules() {
        let mut part = NewPart {
            code: "BRK-01".to_string(),
            name: "Bracket".to_string(),
            stock: 0,
            attributes: PartAttributes::default(),
            is_active: true,
        };
        assert!(validate_new_part(&part).is_ok());

        part.stock = -1;
        assert!(validate_new_part(&part).is_err());

        part.stock = 0;
        part.code = "  ".to_string();
        assert!(validate_new_part(&part).is_err());
    }

    #[test]
    fn part_update_rules() {
        let mut update = PartUpdate {
            code: "BRK-01".to_string(),
            name: "Bracket".to_string(),
            attributes: PartAttributes::default(),
            is_active: true,
        };
        assert!(validate_part_update(&update).is_ok());

        update.attributes.standard_packing = 0;
        assert!(matches!(
            validate_part_update(&update),
            Err(DomainError::Validation { field, .. }) if field == "standard_packing"
        ));

        update.attributes.standard_packing = 12;
        update.name = String::new();
        assert!(validate_part_update(&update).is_err());
    }
}

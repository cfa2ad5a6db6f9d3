//! Domain rule violations
//!
//! These errors carry structured context only. Rendering human-readable
//! messages is left to the consuming layer.

use thiserror::Error;

use crate::models::{DocumentKind, DocumentStatus, MovementType};

/// A business rule rejected the requested change
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Insufficient stock for part {part_code}: available {available}, required {required}")]
    InsufficientStock {
        part_code: String,
        available: i32,
        required: i32,
    },

    #[error("{kind} document is {} and cannot be edited", frozen_state(.status, .confirmed))]
    NotEditable {
        kind: DocumentKind,
        status: DocumentStatus,
        confirmed: bool,
    },

    #[error("{kind} document is already cancelled")]
    AlreadyCancelled { kind: DocumentKind },

    #[error("{kind} documents carry no confirmation flag")]
    NoConfirmationFlag { kind: DocumentKind },

    #[error("Part mismatch: expected {expected}, scanned {scanned}")]
    Mismatch { expected: String, scanned: String },

    #[error("Supply quantity {supplied} exceeds requested quantity {requested}")]
    QuantityExceeded { requested: i32, supplied: i32 },

    #[error("Invalid quantity {qty}: must be greater than 0")]
    InvalidQuantity { qty: i32 },

    #[error("Stock overflow for part {part_code}")]
    StockOverflow { part_code: String },

    #[error("Inconsistent {movement_type} movement: {stock_before} -> {stock_after} for qty {qty}")]
    InconsistentMovement {
        movement_type: MovementType,
        stock_before: i32,
        qty: i32,
        stock_after: i32,
    },

    #[error("No document numbers left under {scope}")]
    NumberingExhausted { scope: String },

    #[error("Validation failed on {field}: {message}")]
    Validation { field: String, message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        DomainError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

fn frozen_state(status: &DocumentStatus, confirmed: &bool) -> &'static str {
    if *confirmed {
        "confirmed"
    } else {
        status.as_str()
    }
}

//! Shared types and rules for the Parts Stock Ledger
//!
//! This crate holds everything about parts, documents and movements that can
//! be decided without touching storage: the document state machine, stock
//! arithmetic, numbering and payload validation. The backend drives these
//! rules inside its database transactions.

pub mod error;
pub mod lifecycle;
pub mod models;
pub mod numbering;
pub mod supply;
pub mod types;
pub mod validation;

pub use error::*;
pub use models::*;
pub use types::*;

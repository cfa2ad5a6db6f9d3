//! Domain models for the Parts Stock Ledger

mod document;
mod movement;
mod part;

pub use document::*;
pub use movement::*;
pub use part::*;

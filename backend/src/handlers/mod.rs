//! HTTP handlers

pub mod documents;
pub mod health;
pub mod movements;
pub mod parts;
pub mod supply;

pub use documents::*;
pub use health::*;
pub use movements::*;
pub use parts::*;
pub use supply::*;

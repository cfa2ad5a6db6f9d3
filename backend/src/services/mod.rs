//! Business logic services for the parts stock ledger

pub mod ledger;
pub mod lifecycle;
pub mod notification;
pub mod numbering;
pub mod parts;
pub mod supply;

pub use ledger::MovementLedger;
pub use lifecycle::DocumentLifecycle;
pub use notification::{BroadcastHook, LoggingHook, PostCommitHooks, RequestItemCreated, RequestItemHook};
pub use numbering::NumberAllocator;
pub use parts::{PartRegistry, StockAdjustment, StockReconciliation};
pub use supply::{SupplyOutcome, SupplyService};

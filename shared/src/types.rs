//! Common types used across the ledger

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who performs an operation and when
///
/// Passed explicitly into every lifecycle operation so the engine never
/// reaches for a clock or a session on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    pub actor_id: Uuid,
    pub now: DateTime<Utc>,
}

impl OperationContext {
    pub fn new(actor_id: Uuid, now: DateTime<Utc>) -> Self {
        Self { actor_id, now }
    }

    /// Context stamped with the current wall clock
    pub fn now(actor_id: Uuid) -> Self {
        Self::new(actor_id, Utc::now())
    }
}

/// Inclusive date range for queries
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

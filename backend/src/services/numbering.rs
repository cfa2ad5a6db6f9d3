//! Document number allocation

use chrono::{DateTime, Utc};

use shared::numbering::{daily_prefix, format_daily_number, next_daily_sequence, next_request_number};
use shared::DocumentKind;

use crate::error::{AppError, AppResult};
use crate::store::StockTx;

const REQUEST_NUMBER_LOCK: &str = "request-number";

/// Issues outgoing and request numbers inside the creating transaction
#[derive(Debug, Clone)]
pub struct NumberAllocator {
    outgoing_prefix: String,
}

impl NumberAllocator {
    pub fn new(outgoing_prefix: impl Into<String>) -> Self {
        Self {
            outgoing_prefix: outgoing_prefix.into(),
        }
    }

    /// Takes the per-prefix lock, then computes the next free number. The
    /// lock is held until `tx` ends, so the caller must insert the document
    /// in the same transaction.
    pub async fn allocate<T: StockTx>(
        &self,
        tx: &mut T,
        kind: DocumentKind,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let key = self.lock_key(kind, now)?;
        tx.lock_numbering(&key).await?;
        self.next_number(tx, kind, now).await
    }

    /// Next number without reserving it
    pub async fn preview<T: StockTx>(
        &self,
        tx: &mut T,
        kind: DocumentKind,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        self.next_number(tx, kind, now).await
    }

    async fn next_number<T: StockTx>(
        &self,
        tx: &mut T,
        kind: DocumentKind,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        match kind {
            DocumentKind::Outgoing => {
                let scoped = daily_prefix(&self.outgoing_prefix, now.date_naive());
                let existing = tx.document_numbers(kind, Some(&scoped)).await?;
                let sequence = next_daily_sequence(existing.iter().map(String::as_str), &scoped)?;
                Ok(format_daily_number(&scoped, sequence))
            }
            DocumentKind::Request => {
                let existing = tx.document_numbers(kind, None).await?;
                Ok(next_request_number(existing.iter().map(String::as_str))?)
            }
            DocumentKind::Receiving => Err(Self::caller_numbered()),
        }
    }

    fn lock_key(&self, kind: DocumentKind, now: DateTime<Utc>) -> AppResult<String> {
        match kind {
            DocumentKind::Outgoing => Ok(daily_prefix(&self.outgoing_prefix, now.date_naive())),
            DocumentKind::Request => Ok(REQUEST_NUMBER_LOCK.to_string()),
            DocumentKind::Receiving => Err(Self::caller_numbered()),
        }
    }

    fn caller_numbered() -> AppError {
        AppError::validation("number", "receiving numbers are supplied by the caller")
    }
}

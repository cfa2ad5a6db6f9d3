//! Part registry: part identity and the running stock counter
//!
//! [`adjust_stock`] is the only code path that rewrites `parts.stock`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use shared::validation::{validate_new_part, validate_part_update};
use shared::{NewPart, Part, PartUpdate, StockChange};

use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, StockTx};

/// Result of one stock adjustment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    /// Part as written, carrying the new stock
    pub part: Part,
    pub change: StockChange,
}

impl StockAdjustment {
    pub fn stock_before(&self) -> i32 {
        self.change.stock_before
    }
}

/// Outcome of checking a part's stock against its ledger
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StockReconciliation {
    pub part_id: Uuid,
    pub code: String,
    pub stock: i32,
    pub opening_stock: i32,
    /// Signed sum of the movements still on the ledger
    pub movement_total: i64,
    pub expected_stock: i64,
    pub latest_stock_after: Option<i32>,
    pub movement_count: usize,
    pub drift: i64,
}

impl StockReconciliation {
    pub fn is_consistent(&self) -> bool {
        self.drift == 0
    }
}

/// Lock the part, apply `delta` and write the result back.
///
/// Fails with `InsufficientStock` when the result would be negative; the
/// caller's transaction is left untouched in that case.
pub async fn adjust_stock<T: StockTx>(
    tx: &mut T,
    part_id: Uuid,
    delta: i32,
    now: DateTime<Utc>,
) -> AppResult<StockAdjustment> {
    let part = tx
        .lock_part(part_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Part {part_id}")))?;

    let change = StockChange::from_delta(&part.code, part.stock, delta)?;
    let part = tx.set_stock(part_id, change.stock_after, now).await?;

    Ok(StockAdjustment { part, change })
}

/// Read side and maintenance operations for parts
#[derive(Clone)]
pub struct PartRegistry<S> {
    store: S,
}

impl<S: InventoryStore> PartRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: Uuid) -> AppResult<Part> {
        let mut tx = self.store.begin().await?;
        tx.find_part(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {id}")))
    }

    pub async fn find_by_code(&self, code: &str) -> AppResult<Part> {
        let mut tx = self.store.begin().await?;
        tx.find_part_by_code(code)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {}", code.trim())))
    }

    pub async fn list(&self) -> AppResult<Vec<Part>> {
        let mut tx = self.store.begin().await?;
        tx.list_parts().await
    }

    pub async fn create(&self, input: NewPart, now: DateTime<Utc>) -> AppResult<Part> {
        validate_new_part(&input)?;

        let mut tx = self.store.begin().await?;
        let part = tx.insert_part(&input, now).await?;
        tx.commit().await?;

        tracing::info!(part_id = %part.id, code = %part.code, stock = part.stock, "Part registered");
        Ok(part)
    }

    /// Rewrites identity and attributes. Stock is left as it is.
    pub async fn update(&self, id: Uuid, update: PartUpdate, now: DateTime<Utc>) -> AppResult<Part> {
        validate_part_update(&update)?;

        let mut tx = self.store.begin().await?;
        let before = tx
            .lock_part(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {id}")))?;
        let part = tx
            .update_part(id, &update, now)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {id}")))?;
        tx.commit().await?;

        tracing::info!(
            part_id = %id,
            code = %part.code,
            previous_code = %before.code,
            "Part updated"
        );
        Ok(part)
    }

    /// Parts referenced by any movement or line item cannot be removed
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tx = self.store.begin().await?;

        let part = tx
            .lock_part(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {id}")))?;

        if tx.part_is_referenced(id).await? {
            return Err(AppError::Conflict {
                resource: "part".to_string(),
                message: format!("part {} is referenced by documents or movements", part.code),
            });
        }

        tx.delete_part(id).await?;
        tx.commit().await?;

        tracing::info!(part_id = %id, code = %part.code, "Part deleted");
        Ok(())
    }

    /// Replays the ledger on top of the opening stock and compares it with
    /// the stored counter
    pub async fn reconcile(&self, id: Uuid) -> AppResult<StockReconciliation> {
        let mut tx = self.store.begin().await?;

        let part = tx
            .find_part(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {id}")))?;
        let movements = tx.movements_for_part(id).await?;

        let movement_total: i64 = movements
            .iter()
            .map(|m| i64::from(m.change().delta()))
            .sum();
        let expected_stock = i64::from(part.opening_stock) + movement_total;
        let drift = i64::from(part.stock) - expected_stock;

        if drift != 0 {
            tracing::warn!(part_id = %id, code = %part.code, drift, "Stock drift detected");
        }

        Ok(StockReconciliation {
            part_id: part.id,
            code: part.code,
            stock: part.stock,
            opening_stock: part.opening_stock,
            movement_total,
            expected_stock,
            latest_stock_after: movements.last().map(|m| m.stock_after),
            movement_count: movements.len(),
            drift,
        })
    }
}

//! Movement ledger
//!
//! Append-only log of stock changes. A movement row and the stock write it
//! describes always share one transaction. Reversal applies the inverse
//! change and deletes the row; rows are never updated.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::{DocumentRef, Movement, MovementFilter, MovementType, NewMovement};

use super::parts::adjust_stock;
use crate::error::AppResult;
use crate::store::{InventoryStore, MovementEntry, StockTx};

/// Move `qty` units of a part in or out on behalf of `document`
pub async fn record<T: StockTx>(
    tx: &mut T,
    part_id: Uuid,
    movement_type: MovementType,
    qty: i32,
    document: DocumentRef,
    now: DateTime<Utc>,
) -> AppResult<Movement> {
    let delta = movement_type.sign() * qty;
    let adjustment = adjust_stock(tx, part_id, delta, now).await?;
    let new_movement = NewMovement::new(part_id, adjustment.change, document)?;
    let movement = tx.insert_movement(&new_movement, now).await?;

    tracing::debug!(
        part = %adjustment.part.code,
        document = %document,
        movement_type = %movement.movement_type,
        qty = movement.qty,
        stock_before = movement.stock_before,
        stock_after = movement.stock_after,
        "Stock movement recorded"
    );

    Ok(movement)
}

/// Undo every movement `document` owns, newest first.
///
/// Returns the reversed movements; a second call finds none and does
/// nothing. Reversing an `in` movement can fail with `InsufficientStock`
/// once the stock it brought in has been issued again.
pub async fn reverse_for<T: StockTx>(
    tx: &mut T,
    document: DocumentRef,
    now: DateTime<Utc>,
) -> AppResult<Vec<Movement>> {
    let movements = tx.movements_for(document).await?;
    if movements.is_empty() {
        return Ok(movements);
    }

    let mut part_ids: Vec<Uuid> = movements.iter().map(|m| m.part_id).collect();
    part_ids.sort();
    part_ids.dedup();
    tx.lock_parts(&part_ids).await?;

    for movement in &movements {
        let adjustment = adjust_stock(tx, movement.part_id, -movement.change().delta(), now).await?;
        tx.delete_movement(movement.id).await?;

        tracing::debug!(
            part = %adjustment.part.code,
            document = %document,
            reversed_type = %movement.movement_type,
            qty = movement.qty,
            stock_before = adjustment.stock_before(),
            stock_after = adjustment.part.stock,
            "Stock movement reversed"
        );
    }

    Ok(movements)
}

/// Read side of the ledger
#[derive(Clone)]
pub struct MovementLedger<S> {
    store: S,
}

impl<S: InventoryStore> MovementLedger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Filtered movement history, newest first
    pub async fn list(&self, filter: &MovementFilter) -> AppResult<Vec<MovementEntry>> {
        let mut tx = self.store.begin().await?;
        tx.list_movements(filter).await
    }

    pub async fn for_document(&self, document: DocumentRef) -> AppResult<Vec<Movement>> {
        let mut tx = self.store.begin().await?;
        tx.movements_for(document).await
    }
}

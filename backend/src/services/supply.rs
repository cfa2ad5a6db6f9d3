//! Supplying a request item from stock
//!
//! Turns a pending request line item into a completed outgoing in one
//! transaction: outgoing header, its single item, the `out` movement and the
//! `is_supplied` flag are written together or not at all.

use serde::Serialize;
use uuid::Uuid;

use shared::supply::{check_supply, supply_notes};
use shared::{
    Document, DocumentKind, DocumentStatus, LineItem, Movement, MovementType, NewDocument,
    NewLineItem, OperationContext,
};

use super::ledger;
use super::numbering::NumberAllocator;
use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, PendingRequestItem, StockTx};

/// Upper bound on one page of the pending-supply queue
pub const PENDING_LIMIT_MAX: u32 = 1000;

#[derive(Debug, Clone, Serialize)]
pub struct SupplyOutcome {
    pub outgoing: Document,
    pub movement: Movement,
    pub item: LineItem,
}

#[derive(Clone)]
pub struct SupplyService<S> {
    store: S,
    numbers: NumberAllocator,
}

impl<S: InventoryStore> SupplyService<S> {
    pub fn new(store: S, numbers: NumberAllocator) -> Self {
        Self { store, numbers }
    }

    /// `qty` defaults to the requested quantity. Whether the item was already
    /// supplied is not checked here; a repeat runs into the stock check.
    ///
    /// Lock order matches document creation: numbering, then the request item,
    /// then the part.
    pub async fn supply(
        &self,
        ctx: &OperationContext,
        item_id: Uuid,
        scanned_code: &str,
        qty: Option<i32>,
    ) -> AppResult<SupplyOutcome> {
        let mut tx = self.store.begin().await?;

        let number = self
            .numbers
            .allocate(&mut tx, DocumentKind::Outgoing, ctx.now)
            .await?;

        let mut item = tx
            .lock_line_item(item_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Request item {item_id}")))?;
        let request = tx
            .find_document(DocumentKind::Request, item.document_id, false)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Request item {item_id}")))?;
        let part = tx
            .lock_part(item.part_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {}", item.part_id)))?;

        let qty = qty.unwrap_or(item.qty);
        check_supply(&part, &item, scanned_code, qty)?;

        let header = NewDocument {
            kind: DocumentKind::Outgoing,
            number,
            actor_id: ctx.actor_id,
            occurred_at: ctx.now,
            status: DocumentStatus::Completed,
            notes: Some(supply_notes(&request.number, request.destination.as_deref())),
            destination: None,
        };
        let mut outgoing = tx.insert_document(&header, ctx.now).await?;
        outgoing.items = tx
            .replace_items(outgoing.id, &[NewLineItem::new(part.id, qty)])
            .await?;

        let movement = ledger::record(
            &mut tx,
            part.id,
            MovementType::Out,
            qty,
            outgoing.reference(),
            ctx.now,
        )
        .await?;

        tx.mark_item_supplied(item.id).await?;
        item.is_supplied = true;

        tx.commit().await?;

        tracing::info!(
            item_id = %item.id,
            request = %request.number,
            outgoing = %outgoing.number,
            part = %part.code,
            qty,
            "Request item supplied"
        );

        Ok(SupplyOutcome {
            outgoing,
            movement,
            item,
        })
    }

    /// Unsupplied items of completed requests, urgent first, then newest.
    pub async fn pending(&self, limit: Option<u32>) -> AppResult<Vec<PendingRequestItem>> {
        let limit = limit.unwrap_or(PENDING_LIMIT_MAX).clamp(1, PENDING_LIMIT_MAX);
        let mut tx = self.store.begin().await?;
        tx.pending_request_items(limit).await
    }
}

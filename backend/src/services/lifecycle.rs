//! Document lifecycle engine
//!
//! One engine serves receivings, outgoings and requests; what differs per
//! kind comes from [`shared::DocumentCapabilities`]. Each operation runs in a
//! single transaction:
//!
//! 1. load and row-lock the document (for edits)
//! 2. decide the transition with [`shared::lifecycle`]
//! 3. lock every touched part in ascending id order
//! 4. reverse old movements, rewrite header and items, record new movements
//! 5. commit, then hand request-item events to the post-commit hooks
//!
//! Any error before step 5 drops the transaction and nothing is written.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared::lifecycle::{plan_cancel, plan_create, plan_toggle_confirmation, plan_update};
use shared::validation::validate_document_input;
use shared::{
    Document, DocumentInput, DocumentKind, DocumentStatus, NewDocument, NewLineItem,
    OperationContext,
};

use super::ledger;
use super::notification::{PostCommitHooks, RequestItemCreated};
use super::numbering::NumberAllocator;
use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, StockTx};

#[derive(Clone)]
pub struct DocumentLifecycle<S> {
    store: S,
    numbers: NumberAllocator,
    hooks: PostCommitHooks,
}

impl<S: InventoryStore> DocumentLifecycle<S> {
    pub fn new(store: S, numbers: NumberAllocator, hooks: PostCommitHooks) -> Self {
        Self {
            store,
            numbers,
            hooks,
        }
    }

    pub async fn get(&self, kind: DocumentKind, id: Uuid) -> AppResult<Document> {
        let mut tx = self.store.begin().await?;
        tx.find_document(kind, id, false)
            .await?
            .ok_or_else(|| not_found(kind, id))
    }

    pub async fn list(
        &self,
        kind: DocumentKind,
        status: Option<DocumentStatus>,
    ) -> AppResult<Vec<Document>> {
        let mut tx = self.store.begin().await?;
        tx.list_documents(kind, status).await
    }

    /// Number the next document of `kind` would get right now
    pub async fn preview_next_number(
        &self,
        kind: DocumentKind,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let mut tx = self.store.begin().await?;
        self.numbers.preview(&mut tx, kind, now).await
    }

    pub async fn create(
        &self,
        ctx: &OperationContext,
        kind: DocumentKind,
        input: DocumentInput,
    ) -> AppResult<Document> {
        validate_document_input(kind, &input)?;
        let plan = plan_create(kind, input.status)?;
        let items = normalize_items(kind, &input.items);

        let mut tx = self.store.begin().await?;

        let number = match caller_number(&input) {
            Some(number) => number,
            None => self.numbers.allocate(&mut tx, kind, ctx.now).await?,
        };

        let header = NewDocument {
            kind,
            number,
            actor_id: ctx.actor_id,
            occurred_at: input.occurred_at.unwrap_or(ctx.now),
            status: input.status,
            notes: input.notes.clone(),
            destination: destination_for(kind, input.destination.as_deref()),
        };
        let mut document = tx.insert_document(&header, ctx.now).await?;

        if plan.apply_new {
            tx.lock_parts(&sorted_part_ids(&items)).await?;
        }
        document.items = tx.replace_items(document.id, &items).await?;
        if plan.apply_new {
            apply_items(&mut tx, &document, ctx.now).await?;
        }

        let events = request_events(&mut tx, &document).await?;
        tx.commit().await?;

        tracing::info!(
            kind = %kind,
            document_id = %document.id,
            number = %document.number,
            status = %document.status,
            items = document.items.len(),
            "Document created"
        );
        self.hooks.dispatch(events);

        Ok(document)
    }

    /// Completed to completed reverses every movement and records the new
    /// item set from scratch
    pub async fn update(
        &self,
        ctx: &OperationContext,
        kind: DocumentKind,
        id: Uuid,
        input: DocumentInput,
    ) -> AppResult<Document> {
        validate_document_input(kind, &input)?;
        let items = normalize_items(kind, &input.items);

        let mut tx = self.store.begin().await?;
        let mut document = tx
            .find_document(kind, id, true)
            .await?
            .ok_or_else(|| not_found(kind, id))?;

        let plan = plan_update(&document, input.status)?;
        let previous_status = document.status;

        if plan.touches_stock() {
            let mut part_ids = sorted_part_ids(&items);
            part_ids.extend(document.items.iter().map(|item| item.part_id));
            part_ids.sort();
            part_ids.dedup();
            tx.lock_parts(&part_ids).await?;
        }

        if plan.reverse_existing {
            ledger::reverse_for(&mut tx, document.reference(), ctx.now).await?;
        }

        if let Some(number) = caller_number(&input) {
            document.number = number;
        }
        document.status = input.status;
        document.notes = input.notes.clone();
        document.destination = destination_for(kind, input.destination.as_deref());
        if let Some(occurred_at) = input.occurred_at {
            document.occurred_at = occurred_at;
        }
        document.updated_at = ctx.now;
        tx.update_document(&document).await?;

        document.items = tx.replace_items(document.id, &items).await?;
        if plan.apply_new {
            apply_items(&mut tx, &document, ctx.now).await?;
        }

        let events = request_events(&mut tx, &document).await?;
        tx.commit().await?;

        tracing::info!(
            kind = %kind,
            document_id = %document.id,
            number = %document.number,
            from = %previous_status,
            to = %document.status,
            "Document updated"
        );
        self.hooks.dispatch(events);

        Ok(document)
    }

    pub async fn cancel(
        &self,
        ctx: &OperationContext,
        kind: DocumentKind,
        id: Uuid,
    ) -> AppResult<Document> {
        let mut tx = self.store.begin().await?;
        let mut document = tx
            .find_document(kind, id, true)
            .await?
            .ok_or_else(|| not_found(kind, id))?;

        let plan = plan_cancel(&document)?;
        let previous_status = document.status;

        if plan.reverse_existing {
            ledger::reverse_for(&mut tx, document.reference(), ctx.now).await?;
        }

        document.status = DocumentStatus::Cancelled;
        document.updated_at = ctx.now;
        tx.update_document(&document).await?;
        tx.commit().await?;

        tracing::info!(
            kind = %kind,
            document_id = %document.id,
            number = %document.number,
            from = %previous_status,
            reversed = plan.reverse_existing,
            "Document cancelled"
        );

        Ok(document)
    }

    /// Flips the goods-receipt / goods-issue flag. Stock and status are
    /// untouched.
    pub async fn toggle_confirmation(
        &self,
        ctx: &OperationContext,
        kind: DocumentKind,
        id: Uuid,
    ) -> AppResult<Document> {
        let mut tx = self.store.begin().await?;
        let mut document = tx
            .find_document(kind, id, true)
            .await?
            .ok_or_else(|| not_found(kind, id))?;

        document.confirmed = plan_toggle_confirmation(&document)?;
        document.updated_at = ctx.now;
        tx.update_document(&document).await?;
        tx.commit().await?;

        tracing::info!(
            kind = %kind,
            document_id = %document.id,
            confirmed = document.confirmed,
            "Document confirmation toggled"
        );

        Ok(document)
    }
}

/// Record one movement per item. Items are ordered by part id, which keeps
/// lock acquisition ordered as well.
async fn apply_items<T: StockTx>(
    tx: &mut T,
    document: &Document,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let Some(movement_type) = document.capabilities().movement_type() else {
        return Ok(());
    };

    for item in &document.items {
        ledger::record(
            tx,
            item.part_id,
            movement_type,
            item.qty,
            document.reference(),
            now,
        )
        .await?;
    }
    Ok(())
}

async fn request_events<T: StockTx>(
    tx: &mut T,
    document: &Document,
) -> AppResult<Vec<RequestItemCreated>> {
    if document.kind != DocumentKind::Request {
        return Ok(Vec::new());
    }

    let mut events = Vec::with_capacity(document.items.len());
    for item in &document.items {
        let part = tx
            .find_part(item.part_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {}", item.part_id)))?;
        events.push(RequestItemCreated::new(document, item, &part));
    }
    Ok(events)
}

/// Sorted by part id; request-only flags are cleared on other kinds
fn normalize_items(kind: DocumentKind, items: &[NewLineItem]) -> Vec<NewLineItem> {
    let request = kind == DocumentKind::Request;
    let mut items: Vec<NewLineItem> = items
        .iter()
        .map(|item| NewLineItem {
            part_id: item.part_id,
            qty: item.qty,
            is_urgent: request && item.is_urgent,
            is_supplied: request && item.is_supplied,
        })
        .collect();
    items.sort_by_key(|item| item.part_id);
    items
}

fn sorted_part_ids(items: &[NewLineItem]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = items.iter().map(|item| item.part_id).collect();
    ids.sort();
    ids.dedup();
    ids
}

fn caller_number(input: &DocumentInput) -> Option<String> {
    input
        .number
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}

fn destination_for(kind: DocumentKind, destination: Option<&str>) -> Option<String> {
    if kind != DocumentKind::Request {
        return None;
    }
    destination
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

fn not_found(kind: DocumentKind, id: Uuid) -> AppError {
    AppError::not_found(format!("{kind} {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_sorted_and_request_flags_cleared() {
        let (a, b) = (Uuid::from_u128(2), Uuid::from_u128(1));
        let mut urgent = NewLineItem::new(a, 3);
        urgent.is_urgent = true;

        let outgoing = normalize_items(DocumentKind::Outgoing, &[urgent.clone(), NewLineItem::new(b, 1)]);
        assert_eq!(outgoing[0].part_id, b);
        assert!(!outgoing[1].is_urgent);

        let request = normalize_items(DocumentKind::Request, &[urgent]);
        assert!(request[0].is_urgent);
    }

    #[test]
    fn destination_is_kept_for_requests_only() {
        assert_eq!(
            destination_for(DocumentKind::Request, Some(" Line 2 ")),
            Some("Line 2".to_string())
        );
        assert_eq!(destination_for(DocumentKind::Outgoing, Some("Line 2")), None);
        assert_eq!(destination_for(DocumentKind::Request, Some("  ")), None);
    }
}

//! In-memory store
//!
//! Used by the tests. A transaction takes the whole-store
//! lock and works on a private copy of the state; commit swaps the copy in,
//! dropping the transaction throws it away. Transactions are therefore fully
//! serialised, which is stricter than the row locks the Postgres store takes.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use shared::{
    normalize_code, Document, DocumentKind, DocumentRef, DocumentStatus, LineItem, Movement,
    MovementFilter, NewDocument, NewLineItem, NewMovement, NewPart, Part, PartUpdate,
};

use super::{InventoryStore, MovementEntry, PendingRequestItem, StockTx};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    parts: BTreeMap<Uuid, Part>,
    /// Headers only; items live in `items`
    documents: HashMap<Uuid, Document>,
    items: Vec<LineItem>,
    /// Insertion order is ledger order
    movements: Vec<Movement>,
}

impl MemoryState {
    fn document_with_items(&self, header: &Document) -> Document {
        let mut document = header.clone();
        document.items = self
            .items
            .iter()
            .filter(|item| item.document_id == header.id)
            .cloned()
            .collect();
        document
    }

    fn code_taken(&self, code: &str, except: Option<Uuid>) -> bool {
        let wanted = normalize_code(code);
        self.parts
            .values()
            .any(|p| normalize_code(&p.code) == wanted && Some(p.id) != except)
    }

    fn number_taken(&self, kind: DocumentKind, number: &str, except: Option<Uuid>) -> bool {
        self.documents
            .values()
            .any(|d| d.kind == kind && d.number == number && Some(d.id) != except)
    }
}

/// Shared handle; clones see the same data
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    type Tx = MemoryTx;

    async fn begin(&self) -> AppResult<MemoryTx> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTx { guard, working })
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

#[async_trait]
impl StockTx for MemoryTx {
    async fn insert_part(&mut self, part: &NewPart, now: DateTime<Utc>) -> AppResult<Part> {
        let code = part.code.trim();
        if self.working.code_taken(code, None) {
            return Err(code_conflict(code));
        }

        let created = Part {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: part.name.trim().to_string(),
            stock: part.stock,
            opening_stock: part.stock,
            attributes: part.attributes.normalized(),
            is_active: part.is_active,
            created_at: now,
            updated_at: now,
        };
        self.working.parts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_part(&mut self, id: Uuid) -> AppResult<Option<Part>> {
        Ok(self.working.parts.get(&id).cloned())
    }

    async fn find_part_by_code(&mut self, code: &str) -> AppResult<Option<Part>> {
        let wanted = normalize_code(code);
        Ok(self
            .working
            .parts
            .values()
            .find(|p| normalize_code(&p.code) == wanted)
            .cloned())
    }

    async fn lock_part(&mut self, id: Uuid) -> AppResult<Option<Part>> {
        Ok(self.working.parts.get(&id).cloned())
    }

    async fn lock_parts(&mut self, _ids: &[Uuid]) -> AppResult<()> {
        Ok(())
    }

    async fn update_part(
        &mut self,
        id: Uuid,
        update: &PartUpdate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Part>> {
        let code = update.code.trim();
        if self.working.code_taken(code, Some(id)) {
            return Err(code_conflict(code));
        }

        let Some(part) = self.working.parts.get_mut(&id) else {
            return Ok(None);
        };
        part.code = code.to_string();
        part.name = update.name.trim().to_string();
        part.attributes = update.attributes.normalized();
        part.is_active = update.is_active;
        part.updated_at = now;
        Ok(Some(part.clone()))
    }

    async fn set_stock(&mut self, id: Uuid, stock: i32, now: DateTime<Utc>) -> AppResult<Part> {
        let part = self
            .working
            .parts
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Part"))?;
        part.stock = stock;
        part.updated_at = now;
        Ok(part.clone())
    }

    async fn list_parts(&mut self) -> AppResult<Vec<Part>> {
        let mut parts: Vec<Part> = self.working.parts.values().cloned().collect();
        parts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(parts)
    }

    async fn part_is_referenced(&mut self, id: Uuid) -> AppResult<bool> {
        Ok(self.working.movements.iter().any(|m| m.part_id == id)
            || self.working.items.iter().any(|i| i.part_id == id))
    }

    async fn delete_part(&mut self, id: Uuid) -> AppResult<bool> {
        Ok(self.working.parts.remove(&id).is_some())
    }

    async fn insert_movement(
        &mut self,
        movement: &NewMovement,
        now: DateTime<Utc>,
    ) -> AppResult<Movement> {
        let change = movement.change;
        let stored = Movement {
            id: Uuid::new_v4(),
            part_id: movement.part_id,
            stock_before: change.stock_before,
            movement_type: change.movement_type,
            qty: change.qty,
            stock_after: change.stock_after,
            document_kind: movement.document.kind,
            document_id: movement.document.id,
            created_at: now,
        };
        self.working.movements.push(stored.clone());
        Ok(stored)
    }

    async fn movements_for(&mut self, document: DocumentRef) -> AppResult<Vec<Movement>> {
        Ok(self
            .working
            .movements
            .iter()
            .rev()
            .filter(|m| m.document() == document)
            .cloned()
            .collect())
    }

    async fn movements_for_part(&mut self, part_id: Uuid) -> AppResult<Vec<Movement>> {
        Ok(self
            .working
            .movements
            .iter()
            .filter(|m| m.part_id == part_id)
            .cloned()
            .collect())
    }

    async fn delete_movement(&mut self, id: Uuid) -> AppResult<()> {
        self.working.movements.retain(|m| m.id != id);
        Ok(())
    }

    async fn list_movements(&mut self, filter: &MovementFilter) -> AppResult<Vec<MovementEntry>> {
        let mut entries: Vec<MovementEntry> = self
            .working
            .movements
            .iter()
            .rev()
            .filter_map(|m| {
                let part = self.working.parts.get(&m.part_id)?;
                filter.matches(m, &part.code).then(|| MovementEntry {
                    movement: m.clone(),
                    part_code: part.code.clone(),
                    part_name: part.name.clone(),
                })
            })
            .collect();
        // Stable, so ties keep newest-inserted first
        entries.sort_by(|a, b| b.movement.created_at.cmp(&a.movement.created_at));
        if let Some(limit) = filter.limit {
            entries.truncate(limit as usize);
        }
        Ok(entries)
    }

    async fn lock_numbering(&mut self, _key: &str) -> AppResult<()> {
        Ok(())
    }

    async fn document_numbers(
        &mut self,
        kind: DocumentKind,
        prefix: Option<&str>,
    ) -> AppResult<Vec<String>> {
        let scoped = prefix.map(|p| format!("{p}-"));
        Ok(self
            .working
            .documents
            .values()
            .filter(|d| d.kind == kind)
            .filter(|d| scoped.as_deref().map_or(true, |p| d.number.starts_with(p)))
            .map(|d| d.number.clone())
            .collect())
    }

    async fn insert_document(
        &mut self,
        document: &NewDocument,
        now: DateTime<Utc>,
    ) -> AppResult<Document> {
        if self.working.number_taken(document.kind, &document.number, None) {
            return Err(AppError::Conflict {
                resource: document.kind.to_string(),
                message: format!("number {} already exists", document.number),
            });
        }

        let created = Document {
            id: Uuid::new_v4(),
            kind: document.kind,
            number: document.number.clone(),
            actor_id: document.actor_id,
            occurred_at: document.occurred_at,
            status: document.status,
            confirmed: false,
            notes: document.notes.clone(),
            destination: document.destination.clone(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.working.documents.insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_document(
        &mut self,
        kind: DocumentKind,
        id: Uuid,
        _for_update: bool,
    ) -> AppResult<Option<Document>> {
        Ok(self
            .working
            .documents
            .get(&id)
            .filter(|d| d.kind == kind)
            .map(|d| self.working.document_with_items(d)))
    }

    async fn update_document(&mut self, document: &Document) -> AppResult<()> {
        if self
            .working
            .number_taken(document.kind, &document.number, Some(document.id))
        {
            return Err(AppError::Conflict {
                resource: document.kind.to_string(),
                message: format!("number {} already exists", document.number),
            });
        }

        let stored = self
            .working
            .documents
            .get_mut(&document.id)
            .ok_or_else(|| AppError::not_found(document.reference()))?;
        *stored = Document {
            items: Vec::new(),
            ..document.clone()
        };
        Ok(())
    }

    async fn replace_items(
        &mut self,
        document_id: Uuid,
        items: &[NewLineItem],
    ) -> AppResult<Vec<LineItem>> {
        self.working.items.retain(|i| i.document_id != document_id);

        let inserted: Vec<LineItem> = items
            .iter()
            .map(|item| LineItem {
                id: Uuid::new_v4(),
                document_id,
                part_id: item.part_id,
                qty: item.qty,
                is_urgent: item.is_urgent,
                is_supplied: item.is_supplied,
            })
            .collect();
        self.working.items.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn lock_line_item(&mut self, id: Uuid) -> AppResult<Option<LineItem>> {
        Ok(self.working.items.iter().find(|i| i.id == id).cloned())
    }

    async fn mark_item_supplied(&mut self, id: Uuid) -> AppResult<()> {
        let item = self
            .working
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| AppError::not_found("Request item"))?;
        item.is_supplied = true;
        Ok(())
    }

    async fn pending_request_items(&mut self, limit: u32) -> AppResult<Vec<PendingRequestItem>> {
        let state = &self.working;
        let mut pending: Vec<(&Document, PendingRequestItem)> = state
            .items
            .iter()
            .filter(|item| !item.is_supplied)
            .filter_map(|item| {
                let request = state
                    .documents
                    .get(&item.document_id)
                    .filter(|d| d.kind == DocumentKind::Request)
                    .filter(|d| d.status == DocumentStatus::Completed)?;
                let part = state.parts.get(&item.part_id)?;
                Some((
                    request,
                    PendingRequestItem {
                        item: item.clone(),
                        request_number: request.number.clone(),
                        destination: request.destination.clone(),
                        requested_by: request.actor_id,
                        requested_at: request.occurred_at,
                        part_code: part.code.clone(),
                        part_name: part.name.clone(),
                        part_stock: part.stock,
                    },
                ))
            })
            .collect();

        pending.sort_by(|(a_doc, a), (b_doc, b)| {
            b.item
                .is_urgent
                .cmp(&a.item.is_urgent)
                .then(b_doc.occurred_at.cmp(&a_doc.occurred_at))
                .then(b_doc.created_at.cmp(&a_doc.created_at))
                .then(a.item.part_id.cmp(&b.item.part_id))
        });
        pending.truncate(limit as usize);
        Ok(pending.into_iter().map(|(_, entry)| entry).collect())
    }

    async fn list_documents(
        &mut self,
        kind: DocumentKind,
        status: Option<DocumentStatus>,
    ) -> AppResult<Vec<Document>> {
        let mut documents: Vec<Document> = self
            .working
            .documents
            .values()
            .filter(|d| d.kind == kind && status.map_or(true, |s| d.status == s))
            .map(|d| self.working.document_with_items(d))
            .collect();
        documents.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at).then(b.number.cmp(&a.number)));
        Ok(documents)
    }

    async fn commit(mut self) -> AppResult<()> {
        *self.guard = self.working;
        Ok(())
    }
}

fn code_conflict(code: &str) -> AppError {
    AppError::Conflict {
        resource: "part".to_string(),
        message: format!("part number {code} already exists"),
    }
}

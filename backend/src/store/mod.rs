//! Storage seam for the ledger
//!
//! Services never talk to a connection directly. They open a [`StockTx`]
//! from an [`InventoryStore`], run every read-modify-write through it and
//! either commit or drop it. Dropping an uncommitted transaction rolls it
//! back, so a `?` anywhere in a service aborts the whole operation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use shared::{
    Document, DocumentKind, DocumentRef, DocumentStatus, LineItem, Movement, MovementFilter,
    NewDocument, NewLineItem, NewMovement, NewPart, Part, PartUpdate,
};

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A movement joined with the part it moved
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MovementEntry {
    #[serde(flatten)]
    pub movement: Movement,
    pub part_code: String,
    pub part_name: String,
}

/// An unsupplied item of a completed request, as shown at the supply counter
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PendingRequestItem {
    #[serde(flatten)]
    pub item: LineItem,
    pub request_number: String,
    pub destination: Option<String>,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
    pub part_code: String,
    pub part_name: String,
    pub part_stock: i32,
}

/// Hands out transactions over one datastore
#[async_trait]
pub trait InventoryStore: Clone + Send + Sync + 'static {
    type Tx: StockTx;

    async fn begin(&self) -> AppResult<Self::Tx>;

    /// Liveness check used by the health endpoint
    async fn ping(&self) -> AppResult<()>;
}

/// One open transaction. Every method observes the writes made earlier in
/// the same transaction.
#[async_trait]
pub trait StockTx: Send + Sized {
    // ------------------------------------------------------------------
    // Parts
    // ------------------------------------------------------------------

    async fn insert_part(&mut self, part: &NewPart, now: DateTime<Utc>) -> AppResult<Part>;

    async fn find_part(&mut self, id: Uuid) -> AppResult<Option<Part>>;

    async fn find_part_by_code(&mut self, code: &str) -> AppResult<Option<Part>>;

    /// Row-locks the part until the transaction ends
    async fn lock_part(&mut self, id: Uuid) -> AppResult<Option<Part>>;

    /// Row-locks several parts in ascending id order
    async fn lock_parts(&mut self, ids: &[Uuid]) -> AppResult<()>;

    /// Rewrites the descriptive fields; never touches stock.
    /// A clashing part number is a `Conflict`.
    async fn update_part(
        &mut self,
        id: Uuid,
        update: &PartUpdate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Part>>;

    async fn set_stock(&mut self, id: Uuid, stock: i32, now: DateTime<Utc>) -> AppResult<Part>;

    async fn list_parts(&mut self) -> AppResult<Vec<Part>>;

    /// True while any movement or line item points at the part
    async fn part_is_referenced(&mut self, id: Uuid) -> AppResult<bool>;

    async fn delete_part(&mut self, id: Uuid) -> AppResult<bool>;

    // ------------------------------------------------------------------
    // Movements
    // ------------------------------------------------------------------

    async fn insert_movement(
        &mut self,
        movement: &NewMovement,
        now: DateTime<Utc>,
    ) -> AppResult<Movement>;

    /// Movements owned by a document, newest first
    async fn movements_for(&mut self, document: DocumentRef) -> AppResult<Vec<Movement>>;

    /// Movements of one part, oldest first
    async fn movements_for_part(&mut self, part_id: Uuid) -> AppResult<Vec<Movement>>;

    async fn delete_movement(&mut self, id: Uuid) -> AppResult<()>;

    /// Newest first
    async fn list_movements(&mut self, filter: &MovementFilter) -> AppResult<Vec<MovementEntry>>;

    // ------------------------------------------------------------------
    // Documents
    // ------------------------------------------------------------------

    /// Serialises number allocation for `key` until the transaction ends
    async fn lock_numbering(&mut self, key: &str) -> AppResult<()>;

    /// Numbers already issued for `kind`, optionally only those under
    /// `<prefix>-`
    async fn document_numbers(
        &mut self,
        kind: DocumentKind,
        prefix: Option<&str>,
    ) -> AppResult<Vec<String>>;

    /// Inserts the header; the returned document has no items yet.
    /// A duplicate number for the same kind is a `Conflict`.
    async fn insert_document(
        &mut self,
        document: &NewDocument,
        now: DateTime<Utc>,
    ) -> AppResult<Document>;

    /// Loads a document with its items; `for_update` row-locks the header
    async fn find_document(
        &mut self,
        kind: DocumentKind,
        id: Uuid,
        for_update: bool,
    ) -> AppResult<Option<Document>>;

    /// Writes back every header field of `document`
    async fn update_document(&mut self, document: &Document) -> AppResult<()>;

    /// Deletes the document's items and inserts `items` in their place
    async fn replace_items(
        &mut self,
        document_id: Uuid,
        items: &[NewLineItem],
    ) -> AppResult<Vec<LineItem>>;

    /// Row-locks the item until the transaction ends
    async fn lock_line_item(&mut self, id: Uuid) -> AppResult<Option<LineItem>>;

    async fn mark_item_supplied(&mut self, id: Uuid) -> AppResult<()>;

    /// Unsupplied items of completed requests: urgent first, then newest
    /// request first
    async fn pending_request_items(&mut self, limit: u32) -> AppResult<Vec<PendingRequestItem>>;

    async fn list_documents(
        &mut self,
        kind: DocumentKind,
        status: Option<DocumentStatus>,
    ) -> AppResult<Vec<Document>>;

    async fn commit(self) -> AppResult<()>;
}

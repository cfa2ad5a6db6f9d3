//! Postgres-backed store
//!
//! Part rows are locked with `SELECT ... FOR UPDATE` before their stock is
//! rewritten, and number allocation takes a transaction-scoped advisory
//! lock. Every transaction sets `lock_timeout`, so a blocked writer fails
//! with SQLSTATE 55P03 (retryable) instead of waiting forever.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use shared::{
    Document, DocumentKind, DocumentRef, DocumentStatus, LineItem, Movement, MovementFilter,
    MovementType, NewDocument, NewLineItem, NewMovement, NewPart, Part, PartAttributes, PartUpdate,
};

use super::{InventoryStore, MovementEntry, PendingRequestItem, StockTx};
use crate::error::{AppError, AppResult};

const PART_COLUMNS: &str = "id, code, name, stock, opening_stock, customer_code, supplier_code, \
                            model, variant, standard_packing, address, is_active, \
                            created_at, updated_at";
const DOCUMENT_COLUMNS: &str = "id, kind, number, actor_id, occurred_at, status, confirmed, \
                                notes, destination, created_at, updated_at";
const MOVEMENT_COLUMNS: &str = "id, part_id, stock_before, movement_type, qty, stock_after, \
                                document_kind, document_id, created_at";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgStore {
    pub fn new(pool: PgPool, lock_timeout_ms: u64) -> Self {
        Self {
            pool,
            lock_timeout_ms,
        }
    }
}

#[async_trait]
impl InventoryStore for PgStore {
    type Tx = PgTx;

    async fn begin(&self) -> AppResult<PgTx> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;
        Ok(PgTx { tx })
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct PartRow {
    id: Uuid,
    code: String,
    name: String,
    stock: i32,
    opening_stock: i32,
    customer_code: Option<String>,
    supplier_code: Option<String>,
    model: Option<String>,
    variant: Option<String>,
    standard_packing: i32,
    address: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PartRow> for Part {
    fn from(row: PartRow) -> Self {
        Part {
            id: row.id,
            code: row.code,
            name: row.name,
            stock: row.stock,
            opening_stock: row.opening_stock,
            attributes: PartAttributes {
                customer_code: row.customer_code,
                supplier_code: row.supplier_code,
                model: row.model,
                variant: row.variant,
                standard_packing: row.standard_packing,
                address: row.address,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: Uuid,
    kind: String,
    number: String,
    actor_id: Uuid,
    occurred_at: DateTime<Utc>,
    status: String,
    confirmed: bool,
    notes: Option<String>,
    destination: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = AppError;

    fn try_from(row: DocumentRow) -> AppResult<Self> {
        Ok(Document {
            id: row.id,
            kind: decode("documents.kind", &row.kind)?,
            number: row.number,
            actor_id: row.actor_id,
            occurred_at: row.occurred_at,
            status: decode("documents.status", &row.status)?,
            confirmed: row.confirmed,
            notes: row.notes,
            destination: row.destination,
            items: Vec::new(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    id: Uuid,
    document_id: Uuid,
    part_id: Uuid,
    qty: i32,
    is_urgent: bool,
    is_supplied: bool,
}

impl From<LineItemRow> for LineItem {
    fn from(row: LineItemRow) -> Self {
        LineItem {
            id: row.id,
            document_id: row.document_id,
            part_id: row.part_id,
            qty: row.qty,
            is_urgent: row.is_urgent,
            is_supplied: row.is_supplied,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    part_id: Uuid,
    stock_before: i32,
    movement_type: String,
    qty: i32,
    stock_after: i32,
    document_kind: String,
    document_id: Uuid,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> AppResult<Self> {
        Ok(Movement {
            id: row.id,
            part_id: row.part_id,
            stock_before: row.stock_before,
            movement_type: decode::<MovementType>("movements.movement_type", &row.movement_type)?,
            qty: row.qty,
            stock_after: row.stock_after,
            document_kind: decode("movements.document_kind", &row.document_kind)?,
            document_id: row.document_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MovementEntryRow {
    #[sqlx(flatten)]
    movement: MovementRow,
    part_code: String,
    part_name: String,
}

#[derive(Debug, FromRow)]
struct PendingItemRow {
    #[sqlx(flatten)]
    item: LineItemRow,
    request_number: String,
    destination: Option<String>,
    requested_by: Uuid,
    requested_at: DateTime<Utc>,
    part_code: String,
    part_name: String,
    part_stock: i32,
}

impl From<PendingItemRow> for PendingRequestItem {
    fn from(row: PendingItemRow) -> Self {
        PendingRequestItem {
            item: row.item.into(),
            request_number: row.request_number,
            destination: row.destination,
            requested_by: row.requested_by,
            requested_at: row.requested_at,
            part_code: row.part_code,
            part_name: row.part_name,
            part_stock: row.part_stock,
        }
    }
}

/// Stored enum columns are written by this module; anything unparseable is
/// corruption, not bad input
fn decode<T>(column: &str, value: &str) -> AppResult<T>
where
    T: FromStr<Err = shared::DomainError>,
{
    value
        .parse()
        .map_err(|_| AppError::Internal(format!("unexpected value '{value}' in {column}")))
}

impl PgTx {
    async fn items_for(&mut self, document_ids: &[Uuid]) -> AppResult<Vec<LineItem>> {
        let rows = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT id, document_id, part_id, qty, is_urgent, is_supplied
            FROM line_items
            WHERE document_id = ANY($1)
            ORDER BY document_id, part_id
            "#,
        )
        .bind(document_ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(LineItem::from).collect())
    }
}

#[async_trait]
impl StockTx for PgTx {
    async fn insert_part(&mut self, part: &NewPart, now: DateTime<Utc>) -> AppResult<Part> {
        let attributes = part.attributes.normalized();
        let row = sqlx::query_as::<_, PartRow>(&format!(
            r#"
            INSERT INTO parts (
                id, code, name, stock, opening_stock, customer_code, supplier_code,
                model, variant, standard_packing, address, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {PART_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(part.code.trim())
        .bind(part.name.trim())
        .bind(part.stock)
        .bind(attributes.customer_code)
        .bind(attributes.supplier_code)
        .bind(attributes.model)
        .bind(attributes.variant)
        .bind(attributes.standard_packing)
        .bind(attributes.address)
        .bind(part.is_active)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write("part", e))?;

        Ok(row.into())
    }

    async fn find_part(&mut self, id: Uuid) -> AppResult<Option<Part>> {
        let row = sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {PART_COLUMNS} FROM parts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Part::from))
    }

    async fn find_part_by_code(&mut self, code: &str) -> AppResult<Option<Part>> {
        let row = sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {PART_COLUMNS} FROM parts WHERE UPPER(code) = UPPER(TRIM($1))"
        ))
        .bind(code)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Part::from))
    }

    async fn lock_part(&mut self, id: Uuid) -> AppResult<Option<Part>> {
        let row = sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {PART_COLUMNS} FROM parts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(Part::from))
    }

    async fn lock_parts(&mut self, ids: &[Uuid]) -> AppResult<()> {
        if ids.is_empty() {
            return Ok(());
        }

        sqlx::query("SELECT id FROM parts WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(ids)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_part(
        &mut self,
        id: Uuid,
        update: &PartUpdate,
        now: DateTime<Utc>,
    ) -> AppResult<Option<Part>> {
        let attributes = update.attributes.normalized();
        let row = sqlx::query_as::<_, PartRow>(&format!(
            r#"
            UPDATE parts
            SET code = $2, name = $3, customer_code = $4, supplier_code = $5, model = $6,
                variant = $7, standard_packing = $8, address = $9, is_active = $10,
                updated_at = $11
            WHERE id = $1
            RETURNING {PART_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(update.code.trim())
        .bind(update.name.trim())
        .bind(attributes.customer_code)
        .bind(attributes.supplier_code)
        .bind(attributes.model)
        .bind(attributes.variant)
        .bind(attributes.standard_packing)
        .bind(attributes.address)
        .bind(update.is_active)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write("part", e))?;

        Ok(row.map(Part::from))
    }

    async fn set_stock(&mut self, id: Uuid, stock: i32, now: DateTime<Utc>) -> AppResult<Part> {
        let row = sqlx::query_as::<_, PartRow>(&format!(
            r#"
            UPDATE parts SET stock = $2, updated_at = $3
            WHERE id = $1
            RETURNING {PART_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(stock)
        .bind(now)
        .fetch_optional(&mut *self.tx)
        .await?
        .ok_or_else(|| AppError::not_found("Part"))?;

        Ok(row.into())
    }

    async fn list_parts(&mut self) -> AppResult<Vec<Part>> {
        let rows = sqlx::query_as::<_, PartRow>(&format!(
            "SELECT {PART_COLUMNS} FROM parts ORDER BY code"
        ))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(Part::from).collect())
    }

    async fn part_is_referenced(&mut self, id: Uuid) -> AppResult<bool> {
        let referenced = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM movements WHERE part_id = $1)
                OR EXISTS(SELECT 1 FROM line_items WHERE part_id = $1)
            "#,
        )
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(referenced)
    }

    async fn delete_part(&mut self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM parts WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_write("part", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_movement(
        &mut self,
        movement: &NewMovement,
        now: DateTime<Utc>,
    ) -> AppResult<Movement> {
        let change = movement.change;
        let row = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            INSERT INTO movements (
                id, part_id, stock_before, movement_type, qty, stock_after,
                document_kind, document_id, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(movement.part_id)
        .bind(change.stock_before)
        .bind(change.movement_type.as_str())
        .bind(change.qty)
        .bind(change.stock_after)
        .bind(movement.document.kind.as_str())
        .bind(movement.document.id)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await?;

        row.try_into()
    }

    async fn movements_for(&mut self, document: DocumentRef) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS} FROM movements
            WHERE document_kind = $1 AND document_id = $2
            ORDER BY seq DESC
            "#
        ))
        .bind(document.kind.as_str())
        .bind(document.id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(Movement::try_from).collect()
    }

    async fn movements_for_part(&mut self, part_id: Uuid) -> AppResult<Vec<Movement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE part_id = $1 ORDER BY seq"
        ))
        .bind(part_id)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter().map(Movement::try_from).collect()
    }

    async fn delete_movement(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM movements WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn list_movements(&mut self, filter: &MovementFilter) -> AppResult<Vec<MovementEntry>> {
        let rows = sqlx::query_as::<_, MovementEntryRow>(
            r#"
            SELECT m.id, m.part_id, m.stock_before, m.movement_type, m.qty, m.stock_after,
                   m.document_kind, m.document_id, m.created_at,
                   p.code AS part_code, p.name AS part_name
            FROM movements m
            JOIN parts p ON p.id = m.part_id
            WHERE ($1::text IS NULL OR m.movement_type = $1)
              AND ($2::text IS NULL OR strpos(UPPER(p.code), UPPER($2)) > 0)
              AND ($3::date IS NULL OR (m.created_at AT TIME ZONE 'UTC')::date >= $3)
              AND ($4::date IS NULL OR (m.created_at AT TIME ZONE 'UTC')::date <= $4)
            ORDER BY m.created_at DESC, m.seq DESC
            LIMIT $5
            "#,
        )
        .bind(filter.movement_type.map(|t| t.as_str()))
        .bind(filter.part_code.as_deref().map(str::trim))
        .bind(filter.created.start)
        .bind(filter.created.end)
        .bind(filter.limit.map(i64::from))
        .fetch_all(&mut *self.tx)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(MovementEntry {
                    movement: row.movement.try_into()?,
                    part_code: row.part_code,
                    part_name: row.part_name,
                })
            })
            .collect()
    }

    async fn lock_numbering(&mut self, key: &str) -> AppResult<()> {
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn document_numbers(
        &mut self,
        kind: DocumentKind,
        prefix: Option<&str>,
    ) -> AppResult<Vec<String>> {
        let numbers = sqlx::query_scalar::<_, String>(
            r#"
            SELECT number FROM documents
            WHERE kind = $1 AND ($2::text IS NULL OR number LIKE $2 || '-%')
            "#,
        )
        .bind(kind.as_str())
        .bind(prefix)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(numbers)
    }

    async fn insert_document(
        &mut self,
        document: &NewDocument,
        now: DateTime<Utc>,
    ) -> AppResult<Document> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            INSERT INTO documents (
                id, kind, number, actor_id, occurred_at, status, confirmed,
                notes, destination, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7, $8, $9, $9)
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(document.kind.as_str())
        .bind(&document.number)
        .bind(document.actor_id)
        .bind(document.occurred_at)
        .bind(document.status.as_str())
        .bind(&document.notes)
        .bind(&document.destination)
        .bind(now)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(document.kind.as_str(), e))?;

        row.try_into()
    }

    async fn find_document(
        &mut self,
        kind: DocumentKind,
        id: Uuid,
        for_update: bool,
    ) -> AppResult<Option<Document>> {
        let lock = if for_update { "FOR UPDATE" } else { "" };
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE kind = $1 AND id = $2 {lock}"
        ))
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut document = Document::try_from(row)?;
        document.items = self.items_for(&[document.id]).await?;
        Ok(Some(document))
    }

    async fn update_document(&mut self, document: &Document) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE documents
            SET number = $2, occurred_at = $3, status = $4, confirmed = $5,
                notes = $6, destination = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(document.id)
        .bind(&document.number)
        .bind(document.occurred_at)
        .bind(document.status.as_str())
        .bind(document.confirmed)
        .bind(&document.notes)
        .bind(&document.destination)
        .bind(document.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| AppError::from_write(document.kind.as_str(), e))?;

        Ok(())
    }

    async fn replace_items(
        &mut self,
        document_id: Uuid,
        items: &[NewLineItem],
    ) -> AppResult<Vec<LineItem>> {
        sqlx::query("DELETE FROM line_items WHERE document_id = $1")
            .bind(document_id)
            .execute(&mut *self.tx)
            .await?;

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, LineItemRow>(
                r#"
                INSERT INTO line_items (id, document_id, part_id, qty, is_urgent, is_supplied)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, document_id, part_id, qty, is_urgent, is_supplied
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(document_id)
            .bind(item.part_id)
            .bind(item.qty)
            .bind(item.is_urgent)
            .bind(item.is_supplied)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| AppError::from_write("line item", e))?;
            inserted.push(row.into());
        }

        Ok(inserted)
    }

    async fn lock_line_item(&mut self, id: Uuid) -> AppResult<Option<LineItem>> {
        let row = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT id, document_id, part_id, qty, is_urgent, is_supplied
            FROM line_items WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(LineItem::from))
    }

    async fn mark_item_supplied(&mut self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE line_items SET is_supplied = TRUE WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn pending_request_items(&mut self, limit: u32) -> AppResult<Vec<PendingRequestItem>> {
        let rows = sqlx::query_as::<_, PendingItemRow>(
            r#"
            SELECT i.id, i.document_id, i.part_id, i.qty, i.is_urgent, i.is_supplied,
                   d.number AS request_number, d.destination, d.actor_id AS requested_by,
                   d.occurred_at AS requested_at,
                   p.code AS part_code, p.name AS part_name, p.stock AS part_stock
            FROM line_items i
            JOIN documents d ON d.id = i.document_id
            JOIN parts p ON p.id = i.part_id
            WHERE d.kind = 'request' AND d.status = 'completed' AND NOT i.is_supplied
            ORDER BY i.is_urgent DESC, d.occurred_at DESC, d.created_at DESC, i.part_id
            LIMIT $1
            "#,
        )
        .bind(i64::from(limit))
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(rows.into_iter().map(PendingRequestItem::from).collect())
    }

    async fn list_documents(
        &mut self,
        kind: DocumentKind,
        status: Option<DocumentStatus>,
    ) -> AppResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS} FROM documents
            WHERE kind = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY occurred_at DESC, number DESC
            "#
        ))
        .bind(kind.as_str())
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&mut *self.tx)
        .await?;

        let mut documents = rows
            .into_iter()
            .map(Document::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let ids: Vec<Uuid> = documents.iter().map(|d| d.id).collect();
        let mut items_by_document: HashMap<Uuid, Vec<LineItem>> = HashMap::new();
        for item in self.items_for(&ids).await? {
            items_by_document.entry(item.document_id).or_default().push(item);
        }
        for document in &mut documents {
            document.items = items_by_document.remove(&document.id).unwrap_or_default();
        }

        Ok(documents)
    }

    async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

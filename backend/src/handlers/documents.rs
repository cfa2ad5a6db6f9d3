//! HTTP handlers for receiving, outgoing and request documents
//!
//! All three kinds share one set of handlers; the kind is the first path
//! segment after `/documents`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{Document, DocumentInput, DocumentKind, DocumentStatus, NewLineItem};

use crate::error::AppResult;
use crate::middleware::Actor;
use crate::store::InventoryStore;
use crate::AppState;

/// Create/update payload shared by every document kind
#[derive(Debug, Deserialize, Validate)]
pub struct DocumentPayload {
    #[validate(length(min = 1, max = 64, message = "Document number must be 1-64 characters"))]
    pub number: Option<String>,
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[validate(length(max = 2000, message = "Notes cannot exceed 2000 characters"))]
    pub notes: Option<String>,
    #[validate(length(max = 255, message = "Destination cannot exceed 255 characters"))]
    pub destination: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<NewLineItem>,
}

impl From<DocumentPayload> for DocumentInput {
    fn from(payload: DocumentPayload) -> Self {
        DocumentInput {
            number: payload.number,
            occurred_at: payload.occurred_at,
            status: payload.status,
            notes: payload.notes,
            destination: payload.destination,
            items: payload.items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DocumentListQuery {
    pub status: Option<DocumentStatus>,
}

#[derive(Debug, Serialize)]
pub struct NextNumberResponse {
    pub kind: DocumentKind,
    pub number: String,
}

/// List documents of one kind
pub async fn list_documents<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Path(kind): Path<DocumentKind>,
    Query(query): Query<DocumentListQuery>,
) -> AppResult<Json<Vec<Document>>> {
    let documents = state.lifecycle().list(kind, query.status).await?;
    Ok(Json(documents))
}

/// Create a document, applying stock when it is created completed
pub async fn create_document<S: InventoryStore>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(kind): Path<DocumentKind>,
    Json(payload): Json<DocumentPayload>,
) -> AppResult<(StatusCode, Json<Document>)> {
    payload.validate()?;

    let document = state
        .lifecycle()
        .create(&actor.context(), kind, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// Get a document with its items
pub async fn get_document<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Path((kind, document_id)): Path<(DocumentKind, Uuid)>,
) -> AppResult<Json<Document>> {
    let document = state.lifecycle().get(kind, document_id).await?;
    Ok(Json(document))
}

/// Replace a document's header, status and items
pub async fn update_document<S: InventoryStore>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path((kind, document_id)): Path<(DocumentKind, Uuid)>,
    Json(payload): Json<DocumentPayload>,
) -> AppResult<Json<Document>> {
    payload.validate()?;

    let document = state
        .lifecycle()
        .update(&actor.context(), kind, document_id, payload.into())
        .await?;
    Ok(Json(document))
}

/// Cancel a document, reversing its stock if it was completed
pub async fn cancel_document<S: InventoryStore>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path((kind, document_id)): Path<(DocumentKind, Uuid)>,
) -> AppResult<Json<Document>> {
    let document = state
        .lifecycle()
        .cancel(&actor.context(), kind, document_id)
        .await?;
    Ok(Json(document))
}

/// Flip the goods receipt / goods issue flag
pub async fn toggle_confirmation<S: InventoryStore>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path((kind, document_id)): Path<(DocumentKind, Uuid)>,
) -> AppResult<Json<Document>> {
    let document = state
        .lifecycle()
        .toggle_confirmation(&actor.context(), kind, document_id)
        .await?;
    Ok(Json(document))
}

/// Number the next document of this kind would receive
pub async fn next_document_number<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Path(kind): Path<DocumentKind>,
) -> AppResult<Json<NextNumberResponse>> {
    let number = state
        .lifecycle()
        .preview_next_number(kind, Utc::now())
        .await?;
    Ok(Json(NextNumberResponse { kind, number }))
}

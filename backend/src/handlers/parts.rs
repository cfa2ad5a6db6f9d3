//! HTTP handlers for the part registry

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use shared::{NewPart, Part, PartAttributes, PartUpdate, StockLevel};

use crate::error::AppResult;
use crate::middleware::Actor;
use crate::services::StockReconciliation;
use crate::store::InventoryStore;
use crate::AppState;

/// Input for registering a part
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePartPayload {
    #[validate(length(min = 1, max = 64, message = "Part number must be 1-64 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Part name must be 1-255 characters"))]
    pub name: String,
    #[validate(range(min = 0, message = "Opening stock cannot be negative"))]
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    #[validate]
    pub attributes: AttributesPayload,
}

/// Replacement of a part's editable fields
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePartPayload {
    #[validate(length(min = 1, max = 64, message = "Part number must be 1-64 characters"))]
    pub code: String,
    #[validate(length(min = 1, max = 255, message = "Part name must be 1-255 characters"))]
    pub name: String,
    pub is_active: Option<bool>,
    #[serde(flatten)]
    #[validate]
    pub attributes: AttributesPayload,
}

/// Descriptive part fields shared by create and update
#[derive(Debug, Deserialize, Validate)]
pub struct AttributesPayload {
    #[validate(length(max = 64))]
    pub customer_code: Option<String>,
    #[validate(length(max = 64))]
    pub supplier_code: Option<String>,
    #[validate(length(max = 128))]
    pub model: Option<String>,
    #[validate(length(max = 128))]
    pub variant: Option<String>,
    #[validate(range(min = 1, message = "Standard packing must be at least 1"))]
    pub standard_packing: Option<i32>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
}

impl From<AttributesPayload> for PartAttributes {
    fn from(payload: AttributesPayload) -> Self {
        PartAttributes {
            customer_code: payload.customer_code,
            supplier_code: payload.supplier_code,
            model: payload.model,
            variant: payload.variant,
            standard_packing: payload.standard_packing.unwrap_or(1),
            address: payload.address,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PartQuery {
    /// Exact part number lookup, case-insensitive
    pub code: Option<String>,
}

/// Part with its derived stock classification
#[derive(Debug, Serialize)]
pub struct PartResponse {
    #[serde(flatten)]
    pub part: Part,
    pub stock_status: StockLevel,
}

impl From<Part> for PartResponse {
    fn from(part: Part) -> Self {
        Self {
            stock_status: part.stock_level(),
            part,
        }
    }
}

/// List parts, or look one up by part number
pub async fn list_parts<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<PartQuery>,
) -> AppResult<Json<Vec<PartResponse>>> {
    let registry = state.parts();
    let parts = match query.code.as_deref() {
        Some(code) => vec![registry.find_by_code(code).await?],
        None => registry.list().await?,
    };
    Ok(Json(parts.into_iter().map(PartResponse::from).collect()))
}

/// Register a part
pub async fn create_part<S: InventoryStore>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Json(payload): Json<CreatePartPayload>,
) -> AppResult<(StatusCode, Json<PartResponse>)> {
    payload.validate()?;

    let input = NewPart {
        code: payload.code,
        name: payload.name,
        stock: payload.stock.unwrap_or(0),
        attributes: payload.attributes.into(),
        is_active: payload.is_active.unwrap_or(true),
    };
    let part = state.parts().create(input, actor.context().now).await?;
    Ok((StatusCode::CREATED, Json(part.into())))
}

/// Get a part
pub async fn get_part<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<PartResponse>> {
    let part = state.parts().get(part_id).await?;
    Ok(Json(part.into()))
}

/// Edit a part's identity and attributes; stock in the body is ignored
pub async fn update_part<S: InventoryStore>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(part_id): Path<Uuid>,
    Json(payload): Json<UpdatePartPayload>,
) -> AppResult<Json<PartResponse>> {
    payload.validate()?;

    let update = PartUpdate {
        code: payload.code,
        name: payload.name,
        attributes: payload.attributes.into(),
        is_active: payload.is_active.unwrap_or(true),
    };
    let part = state.parts().update(part_id, update, actor.context().now).await?;
    Ok(Json(part.into()))
}

/// Delete a part that nothing references
pub async fn delete_part<S: InventoryStore>(
    State(state): State<AppState<S>>,
    _actor: Actor,
    Path(part_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.parts().delete(part_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Compare a part's stock with its ledger
pub async fn reconcile_part<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Path(part_id): Path<Uuid>,
) -> AppResult<Json<StockReconciliation>> {
    let report = state.parts().reconcile(part_id).await?;
    Ok(Json(report))
}

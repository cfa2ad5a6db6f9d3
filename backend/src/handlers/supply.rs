//! HTTP handler for supplying request items

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::Actor;
use crate::services::SupplyOutcome;
use crate::store::{InventoryStore, PendingRequestItem};
use crate::AppState;

/// Scan result submitted at the counter
#[derive(Debug, Deserialize, Validate)]
pub struct SupplyPayload {
    #[validate(length(min = 1, message = "Scanned part number is required"))]
    pub scanned_code: String,
    #[validate(range(min = 1, message = "Quantity must be greater than 0"))]
    pub qty: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    pub limit: Option<u32>,
}

/// The supply counter's work queue
pub async fn list_pending_request_items<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<PendingQuery>,
) -> AppResult<Json<Vec<PendingRequestItem>>> {
    let items = state.supply().pending(query.limit).await?;
    Ok(Json(items))
}

/// Issue stock for a request item as a completed outgoing
pub async fn supply_request_item<S: InventoryStore>(
    State(state): State<AppState<S>>,
    actor: Actor,
    Path(item_id): Path<Uuid>,
    Json(payload): Json<SupplyPayload>,
) -> AppResult<Json<SupplyOutcome>> {
    payload.validate()?;

    let outcome = state
        .supply()
        .supply(&actor.context(), item_id, &payload.scanned_code, payload.qty)
        .await?;
    Ok(Json(outcome))
}

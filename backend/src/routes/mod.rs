//! Route definitions for the parts stock ledger

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, store::InventoryStore, AppState};

/// Create API routes
pub fn api_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(handlers::health_check::<S>))
        .nest("/parts", part_routes::<S>())
        .route("/movements", get(handlers::list_movements::<S>))
        .nest("/documents", document_routes::<S>())
        .route(
            "/request-items/pending",
            get(handlers::list_pending_request_items::<S>),
        )
        .route(
            "/request-items/:item_id/supply",
            post(handlers::supply_request_item::<S>),
        )
}

/// Part registry routes
fn part_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/",
            get(handlers::list_parts::<S>).post(handlers::create_part::<S>),
        )
        .route(
            "/:part_id",
            get(handlers::get_part::<S>)
                .put(handlers::update_part::<S>)
                .delete(handlers::delete_part::<S>),
        )
        .route("/:part_id/reconcile", get(handlers::reconcile_part::<S>))
}

/// Document lifecycle routes, one set for every kind
fn document_routes<S: InventoryStore>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/:kind",
            get(handlers::list_documents::<S>).post(handlers::create_document::<S>),
        )
        .route("/:kind/next-number", get(handlers::next_document_number::<S>))
        .route(
            "/:kind/:document_id",
            get(handlers::get_document::<S>).put(handlers::update_document::<S>),
        )
        .route("/:kind/:document_id/cancel", post(handlers::cancel_document::<S>))
        .route(
            "/:kind/:document_id/confirmation",
            post(handlers::toggle_confirmation::<S>),
        )
}

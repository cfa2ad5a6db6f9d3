//! Parts Stock Ledger - backend
//!
//! Part stock counters, an append-only movement ledger and the lifecycle of
//! receiving, outgoing and request documents, served over HTTP.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;

use services::{
    BroadcastHook, DocumentLifecycle, LoggingHook, MovementLedger, NumberAllocator, PartRegistry,
    PostCommitHooks, SupplyService,
};
use store::{InventoryStore, PgStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState<S = PgStore> {
    pub store: S,
    pub config: Arc<Config>,
    pub hooks: PostCommitHooks,
    /// Live feed of request-item events
    pub request_items: BroadcastHook,
}

impl<S: InventoryStore> AppState<S> {
    /// State with the default hook list: log every request item and
    /// republish it on the live feed
    pub fn new(store: S, config: Config) -> Self {
        let request_items = BroadcastHook::new(config.ledger.notification_capacity);
        let hooks = PostCommitHooks::new()
            .with_hook(Arc::new(LoggingHook))
            .with_hook(Arc::new(request_items.clone()));

        Self {
            store,
            config: Arc::new(config),
            hooks,
            request_items,
        }
    }

    pub fn numbers(&self) -> NumberAllocator {
        NumberAllocator::new(self.config.ledger.outgoing_prefix.trim())
    }

    pub fn parts(&self) -> PartRegistry<S> {
        PartRegistry::new(self.store.clone())
    }

    pub fn ledger(&self) -> MovementLedger<S> {
        MovementLedger::new(self.store.clone())
    }

    pub fn lifecycle(&self) -> DocumentLifecycle<S> {
        DocumentLifecycle::new(self.store.clone(), self.numbers(), self.hooks.clone())
    }

    pub fn supply(&self) -> SupplyService<S> {
        SupplyService::new(self.store.clone(), self.numbers())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app<S: InventoryStore>(state: AppState<S>) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .nest("/api/v1", routes::api_routes::<S>())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Parts Stock Ledger API v1"
}

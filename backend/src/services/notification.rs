//! Post-commit notifications for request items
//!
//! Hooks run after the creating transaction has committed, on a detached
//! task. A failing hook is logged and forgotten; it can never undo or
//! delay the write that triggered it.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use shared::{Document, LineItem, Part};

/// Part fields carried on a request-item event
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventPart {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub stock: i32,
}

/// Request header fields carried on a request-item event
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventRequest {
    pub id: Uuid,
    pub number: String,
    pub destination: Option<String>,
    pub requested_by: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// A request line item was written
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RequestItemCreated {
    pub item_id: Uuid,
    pub qty: i32,
    pub is_urgent: bool,
    pub is_supplied: bool,
    pub part: EventPart,
    pub request: EventRequest,
}

impl RequestItemCreated {
    pub fn new(request: &Document, item: &LineItem, part: &Part) -> Self {
        Self {
            item_id: item.id,
            qty: item.qty,
            is_urgent: item.is_urgent,
            is_supplied: item.is_supplied,
            part: EventPart {
                id: part.id,
                code: part.code.clone(),
                name: part.name.clone(),
                stock: part.stock,
            },
            request: EventRequest {
                id: request.id,
                number: request.number.clone(),
                destination: request.destination.clone(),
                requested_by: request.actor_id,
                requested_at: request.occurred_at,
            },
        }
    }
}

/// Receives request-item events after commit
#[async_trait]
pub trait RequestItemHook: Send + Sync {
    fn name(&self) -> &'static str;

    async fn on_request_item_created(&self, event: &RequestItemCreated) -> anyhow::Result<()>;
}

/// Ordered hook list invoked after successful commits
#[derive(Clone, Default)]
pub struct PostCommitHooks {
    hooks: Vec<Arc<dyn RequestItemHook>>,
}

impl PostCommitHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: Arc<dyn RequestItemHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Fire and forget. Must be called from inside a tokio runtime.
    pub fn dispatch(&self, events: Vec<RequestItemCreated>) {
        if events.is_empty() || self.hooks.is_empty() {
            return;
        }

        let hooks = self.hooks.clone();
        tokio::spawn(async move {
            for event in &events {
                for hook in &hooks {
                    if let Err(e) = hook.on_request_item_created(event).await {
                        tracing::warn!(
                            hook = hook.name(),
                            item_id = %event.item_id,
                            request = %event.request.number,
                            "Request item notification failed: {:#}",
                            e
                        );
                    }
                }
            }
        });
    }
}

/// Writes each event to the log
pub struct LoggingHook;

#[async_trait]
impl RequestItemHook for LoggingHook {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn on_request_item_created(&self, event: &RequestItemCreated) -> anyhow::Result<()> {
        tracing::info!(
            item_id = %event.item_id,
            request = %event.request.number,
            part = %event.part.code,
            qty = event.qty,
            urgent = event.is_urgent,
            "Request item created"
        );
        Ok(())
    }
}

/// Republishes events on an in-process channel for live listeners
#[derive(Clone)]
pub struct BroadcastHook {
    sender: broadcast::Sender<RequestItemCreated>,
}

impl BroadcastHook {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RequestItemCreated> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl RequestItemHook for BroadcastHook {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    async fn on_request_item_created(&self, event: &RequestItemCreated) -> anyhow::Result<()> {
        // No subscribers is not an error
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}

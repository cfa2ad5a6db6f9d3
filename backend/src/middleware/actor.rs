//! Acting-user extraction
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in the `x-actor-id` header. Handlers turn it into the explicit
//! [`OperationContext`] every write operation takes.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::OperationContext;
use uuid::Uuid;

use crate::error::AppError;

pub const ACTOR_HEADER: &str = "x-actor-id";

/// Extractor for the acting user
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actor(pub Uuid);

impl Actor {
    /// Context stamped with the current time
    pub fn context(&self) -> OperationContext {
        OperationContext::now(self.0)
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACTOR_HEADER)
            .ok_or_else(|| AppError::validation(ACTOR_HEADER, "header is required"))?;

        value
            .to_str()
            .ok()
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(Actor)
            .ok_or_else(|| AppError::validation(ACTOR_HEADER, "header must be a UUID"))
    }
}

//! Error handling for the Parts Stock Ledger
//!
//! Every error renders as a JSON body with a stable code and a structured
//! context object, so callers can build their own messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use shared::DomainError;
use thiserror::Error;

/// SQLSTATE codes that mean "try the whole operation again"
const RETRYABLE_SQLSTATES: [&str; 3] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available (lock_timeout)
];

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {message}")]
    Forbidden { message: String, context: Value },

    #[error("Insufficient stock for part {part_code}: available {available}, required {required}")]
    InsufficientStock {
        part_code: String,
        available: i32,
        required: i32,
    },

    #[error("Part mismatch: expected {expected}, scanned {scanned}")]
    Mismatch { expected: String, scanned: String },

    #[error("Supply quantity {supplied} exceeds requested quantity {requested}")]
    QuantityExceeded { requested: i32, supplied: i32 },

    #[error("Conflict on {resource}: {message}")]
    Conflict { resource: String, message: String },

    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Ledger invariant violated: {0}")]
    Invariant(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

}

impl AppError {
    pub fn not_found(resource: impl std::fmt::Display) -> Self {
        AppError::NotFound(resource.to_string())
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Transient database failures; the caller may rerun the operation
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::DatabaseError(sqlx::Error::PoolTimedOut) => true,
            AppError::DatabaseError(sqlx::Error::Io(_)) => true,
            AppError::DatabaseError(sqlx::Error::Database(db)) => db
                .code()
                .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&code.as_ref())),
            _ => false,
        }
    }

    /// Map unique and foreign-key violations to `Conflict`, pass anything
    /// else on
    pub fn from_write(resource: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let code = db.code();
            if matches!(code.as_deref(), Some(UNIQUE_VIOLATION | FOREIGN_KEY_VIOLATION)) {
                return AppError::Conflict {
                    resource: resource.to_string(),
                    message: db.message().to_string(),
                };
            }
        }
        AppError::DatabaseError(err)
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden { .. } => "FORBIDDEN",
            AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            AppError::Mismatch { .. } => "PART_MISMATCH",
            AppError::QuantityExceeded { .. } => "QUANTITY_EXCEEDED",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::Invariant(_) => "LEDGER_INVARIANT",
            AppError::DatabaseError(_) if self.is_retryable() => "RETRYABLE",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::InsufficientStock { .. }
            | AppError::Mismatch { .. }
            | AppError::QuantityExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) if self.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Invariant(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn context(&self) -> Value {
        match self {
            AppError::NotFound(resource) => json!({ "resource": resource }),
            AppError::Forbidden { context, .. } => context.clone(),
            AppError::InsufficientStock {
                part_code,
                available,
                required,
            } => json!({
                "part_code": part_code,
                "available": available,
                "required": required,
            }),
            AppError::Mismatch { expected, scanned } => {
                json!({ "expected": expected, "scanned": scanned })
            }
            AppError::QuantityExceeded {
                requested,
                supplied,
            } => json!({ "requested": requested, "supplied": supplied }),
            AppError::Conflict { resource, .. } => json!({ "resource": resource }),
            AppError::Validation { field, .. } => json!({ "field": field }),
            _ => Value::Null,
        }
    }

    /// Client-facing message; server-side failures stay opaque
    fn public_message(&self) -> String {
        match self.status() {
            StatusCode::INTERNAL_SERVER_ERROR => "An internal server error occurred".to_string(),
            StatusCode::SERVICE_UNAVAILABLE => {
                "The operation conflicted with concurrent activity; retry it".to_string()
            }
            _ => self.to_string(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();
        match err {
            DomainError::InsufficientStock {
                part_code,
                available,
                required,
            } => AppError::InsufficientStock {
                part_code,
                available,
                required,
            },
            DomainError::NotEditable {
                kind,
                status,
                confirmed,
            } => AppError::Forbidden {
                message,
                context: json!({ "kind": kind, "status": status, "confirmed": confirmed }),
            },
            DomainError::AlreadyCancelled { kind } => AppError::Forbidden {
                message,
                context: json!({ "kind": kind, "status": "cancelled" }),
            },
            DomainError::NoConfirmationFlag { kind } => AppError::Forbidden {
                message,
                context: json!({ "kind": kind }),
            },
            DomainError::Mismatch { expected, scanned } => AppError::Mismatch { expected, scanned },
            DomainError::QuantityExceeded {
                requested,
                supplied,
            } => AppError::QuantityExceeded {
                requested,
                supplied,
            },
            DomainError::InvalidQuantity { .. } => AppError::validation("qty", message),
            DomainError::Validation { field, message } => AppError::Validation { field, message },
            DomainError::NumberingExhausted { .. } => AppError::Conflict {
                resource: "number".to_string(),
                message,
            },
            DomainError::StockOverflow { .. } | DomainError::InconsistentMovement { .. } => {
                AppError::Invariant(message)
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors
            .field_errors()
            .keys()
            .min()
            .map(|field| field.to_string())
            .unwrap_or_else(|| "payload".to_string());
        AppError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub context: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Rejected: {}", self);
        }

        let detail = ErrorDetail {
            code: self.code().to_string(),
            message: self.public_message(),
            retryable: self.is_retryable(),
            context: self.context(),
        };

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for services and handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{DocumentKind, DocumentStatus};

    #[test]
    fn insufficient_stock_keeps_its_context() {
        let err: AppError = DomainError::InsufficientStock {
            part_code: "P-1".to_string(),
            available: 3,
            required: 5,
        }
        .into();
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.context(),
            json!({ "part_code": "P-1", "available": 3, "required": 5 })
        );
    }

    #[test]
    fn editing_frozen_documents_is_forbidden() {
        let err: AppError = DomainError::NotEditable {
            kind: DocumentKind::Outgoing,
            status: DocumentStatus::Completed,
            confirmed: true,
        }
        .into();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert_eq!(err.code(), "FORBIDDEN");
        assert_eq!(err.context()["confirmed"], json!(true));
    }

    #[test]
    fn pool_timeouts_are_retryable() {
        let err = AppError::DatabaseError(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!AppError::not_found("Part").is_retryable());
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = AppError::Internal("pool exploded".to_string());
        assert_eq!(err.public_message(), "An internal server error occurred");
    }
}

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use orchard_catalog::{PricingError, ScheduleError};
use orchard_core::{CoreError, LedgerError, StoreError};

/// Machine-readable reasons a client can branch on for 409 responses.
pub mod reason {
    pub const FULLY_BOOKED: &str = "fully_booked";
    pub const SLOT_CLOSED: &str = "slot_closed";
    pub const DUPLICATE_CODE: &str = "duplicate_code";
    pub const INVALID_TRANSITION: &str = "invalid_transition";
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("{message}")]
    ConflictError { reason: &'static str, message: String },
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    InternalServerError(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    pub fn conflict(reason: &'static str, message: impl Into<String>) -> Self {
        AppError::ConflictError {
            reason,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, reason) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::ConflictError { reason, message } => (StatusCode::CONFLICT, message, Some(reason)),
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg, None),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string(), None)
            }
        };

        let mut body = json!({
            "success": false,
            "error": error_message,
        });
        if let Some(reason) = reason {
            body["reason"] = json!(reason);
        }

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFoundError(format!("{} not found", what)),
            StoreError::Duplicate(what) => AppError::conflict(reason::DUPLICATE_CODE, format!("{} already exists", what)),
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidQuantity(_) | LedgerError::InvalidInput(_) => {
                AppError::ValidationError(err.to_string())
            }
            LedgerError::GiftCodeUnavailable { .. } => AppError::InternalServerError(err.to_string()),
            LedgerError::Store(store) => store.into(),
        }
    }
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AppError::ValidationError(msg),
        }
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<ScheduleError> for AppError {
    fn from(err: ScheduleError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

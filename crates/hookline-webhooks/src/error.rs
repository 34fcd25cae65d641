//! Error types for the webhook dispatch subsystem.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use hookline_db::StoreError;

/// Webhook subsystem error variants.
///
/// Transient delivery failures (timeouts, 5xx) are not errors at this
/// level; they are recorded on delivery attempts and drive the retry
/// path.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Duplicate {0}")]
    Duplicate(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("SSRF protection: {0}")]
    SsrfDetected(String),

    #[error("Event type not found")]
    EventTypeNotFound,

    #[error("Endpoint not found")]
    EndpointNotFound,

    #[error("Event not found")]
    EventNotFound,

    #[error("Delivery not found")]
    DeliveryNotFound,

    #[error("Filter not found")]
    FilterNotFound,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// JSON error response returned by the admin API.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            WebhookError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            WebhookError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate"),
            WebhookError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
            WebhookError::SsrfDetected(_) => (StatusCode::BAD_REQUEST, "ssrf_detected"),
            WebhookError::EventTypeNotFound => (StatusCode::NOT_FOUND, "event_type_not_found"),
            WebhookError::EndpointNotFound => (StatusCode::NOT_FOUND, "endpoint_not_found"),
            WebhookError::EventNotFound => (StatusCode::NOT_FOUND, "event_not_found"),
            WebhookError::DeliveryNotFound => (StatusCode::NOT_FOUND, "delivery_not_found"),
            WebhookError::FilterNotFound => (StatusCode::NOT_FOUND, "filter_not_found"),
            WebhookError::EncryptionFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "encryption_error")
            }
            WebhookError::Store(StoreError::Duplicate { .. }) => {
                (StatusCode::CONFLICT, "duplicate")
            }
            WebhookError::Store(StoreError::MissingReference { .. }) => {
                (StatusCode::BAD_REQUEST, "missing_reference")
            }
            WebhookError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "storage_error"),
            WebhookError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = ErrorResponse {
            error: error_type.to_string(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, WebhookError>;

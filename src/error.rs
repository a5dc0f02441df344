use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Errors raised by the imaging / analysis layer.
#[derive(Debug, thiserror::Error)]
pub enum DentalError {
    #[error("image file not found: {0}")]
    ImageNotFound(String),

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels ({width}x{height})")]
    EmptyImage { width: u32, height: u32 },

    #[error("severity level must be within 1..=10, got {0}")]
    InvalidSeverity(u8),

    #[error("unknown position scheme: {0}")]
    UnknownScheme(String),

    #[error("noise model rejected sigma {0}")]
    Noise(f64),
}

pub type DentalResult<T> = Result<T, DentalError>;

/// HTTP-facing error. Renders as `{ "error": .., "code": .. }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Dental(#[from] DentalError),

    #[error("session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// The requested step needs an earlier workflow step first.
    #[error("{0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Dental(err) => match err {
                DentalError::ImageNotFound(_) => {
                    (StatusCode::NOT_FOUND, "IMAGE_NOT_FOUND", err.to_string())
                }
                DentalError::Decode(_) | DentalError::EmptyImage { .. } => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "UNREADABLE_IMAGE",
                    err.to_string(),
                ),
                DentalError::InvalidSeverity(_) | DentalError::UnknownScheme(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string())
                }
                DentalError::Noise(_) => {
                    tracing::error!(error = %err, "Filter failure");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "An internal error occurred".to_string(),
                    )
                }
            },
            AppError::SessionNotFound(_) => {
                (StatusCode::NOT_FOUND, "SESSION_NOT_FOUND", self.to_string())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "WORKFLOW_CONFLICT", msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<crate::session::StaleRevision> for AppError {
    fn from(err: crate::session::StaleRevision) -> Self {
        AppError::Conflict(err.to_string())
    }
}

pub mod metrics;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::error::{CollectError, StoreError};

// ─── Scrape failures ─────────────────────────────────────────────

/// Rendered as a plain-text body carrying the reason.
#[derive(Debug)]
pub enum AppError {
    /// The measurement store could not be reached; the next scrape may succeed.
    StoreUnavailable(String),
    Internal(String),
}

impl From<CollectError> for AppError {
    fn from(e: CollectError) -> Self {
        match e {
            CollectError::Store(
                StoreError::Unavailable(_) | StoreError::Timeout { .. } | StoreError::InvalidUrl { .. },
            ) => Self::StoreUnavailable(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::StoreUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, format!("{message}\n")).into_response()
    }
}

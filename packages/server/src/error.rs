//! API Error Mapping
//!
//! Classifies engine errors into the HTTP statuses of the public contract:
//! validation 400, lookups 404, conflicts 409, insufficient balance 422,
//! rate limit 429, everything else 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use coinvault_engine::{EngineError, ErrorKind};

use crate::envelope::Envelope;

/// Errors surfaced by the HTTP layer.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("idempotency key is required and must be at least 8 characters")]
    IdempotencyKey,

    #[error("{message}")]
    BadRequest { message: String },

    #[error("rate limit exceeded, try again later")]
    RateLimited,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest { message: message.into() }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Engine(err) => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Conflict => StatusCode::CONFLICT,
                ErrorKind::InsufficientBalance => StatusCode::UNPROCESSABLE_ENTITY,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::IdempotencyKey | ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(Envelope::<()>::err(self.to_string()))).into_response()
    }
}

//! The ingestion service's error taxonomy (§7) and its HTTP mapping (§6).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// One of the five error kinds from §7, each carrying the message surfaced
/// to the caller.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed input: bad `threat_score`, unknown `level`, wrong-type
    /// array. Never logged at error level (§7).
    #[error("{0}")]
    Validation(String),
    /// Missing or wrong bot secret, or missing `X-Bot-Id` on an event
    /// endpoint (§6).
    #[error("{0}")]
    Auth(String),
    /// Unknown entity.
    #[error("{0}")]
    NotFound(String),
    /// DB timeout, pub/sub unavailable — logged and retried where retry is
    /// in scope; otherwise surfaced as a 500.
    #[error("transient failure: {0}")]
    Transient(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Auth(msg) => {
                tracing::debug!(target: "sentinel_ingest::error", %msg, "auth rejected");
                (StatusCode::UNAUTHORIZED, "Invalid bot secret".to_string())
            }
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Transient(msg) => {
                tracing::warn!(target: "sentinel_ingest::error", %msg, "transient failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "temporarily unavailable".to_string())
            }
            Self::Database(err) => {
                tracing::error!(target: "sentinel_ingest::error", error = %err, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

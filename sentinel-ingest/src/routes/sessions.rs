//! `POST /api/sessions`, `PUT /api/sessions/:sessionId`, `GET
//! /api/sessions/:sessionId/replay` (§4.8).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use sentinel_types::{Session, SessionPatch};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::IngestError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateSessionBody {
    pub session_id: String,
    pub bot_id: String,
    pub user_id: String,
}

/// Idempotent on `session_id` (§8 invariant 6): a second POST with the same
/// id returns the already-existing row rather than creating a second one.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSessionBody>,
) -> Result<(StatusCode, Json<Value>), IngestError> {
    let session = Session::new(body.session_id.clone(), body.bot_id, body.user_id);
    state.store.insert_session_if_absent(&session).await?;
    let stored = state
        .store
        .get_session(&body.session_id)
        .await?
        .ok_or_else(|| IngestError::Transient("session vanished immediately after insert".to_string()))?;
    state.hub.broadcast("session:started", serde_json::to_value(&stored).unwrap_or_default());
    Ok((StatusCode::CREATED, Json(json!(stored))))
}

/// Field-wise partial update; `metadata` merges rather than replaces (§4.8,
/// §6).
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(patch): Json<SessionPatch>,
) -> Result<Json<Value>, IngestError> {
    let updated = state
        .store
        .patch_session(&session_id, patch)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("unknown session {session_id}")))?;
    state.hub.broadcast("session:updated", serde_json::to_value(&updated).unwrap_or_default());
    Ok(Json(json!(updated)))
}

/// Returns the session with its full turn-by-turn `conversation_log`.
pub async fn replay(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, IngestError> {
    let session = state
        .store
        .get_session(&session_id)
        .await?
        .ok_or_else(|| IngestError::NotFound(format!("unknown session {session_id}")))?;
    Ok(Json(json!(session)))
}

//! `POST /api/patterns` (§4.8): record a candidate novel pattern.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sentinel_types::{NovelPattern, NovelPatternSubmission};
use serde_json::{json, Value};

use crate::error::IngestError;
use crate::state::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<NovelPatternSubmission>,
) -> Result<(StatusCode, Json<Value>), IngestError> {
    let pattern = NovelPattern::first_occurrence(submission, Utc::now());
    let stored = state.store.upsert_novel_pattern(&pattern).await?;
    Ok((StatusCode::CREATED, Json(json!(stored))))
}

//! `POST /api/events`, `POST /api/events/batch`, `GET /api/events`, `GET
//! /api/events/stream` (§4.8).

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{Extension, Query, State};
use axum::http::{header, StatusCode};
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::auth::BotId;
use crate::error::IngestError;
use crate::processor::IncomingEvent;
use crate::state::AppState;
use crate::store::EventFilter;

/// `POST /api/events`: single event, delegates straight to the processor.
pub async fn create(
    State(state): State<Arc<AppState>>,
    Extension(BotId(bot_id)): Extension<BotId>,
    Json(incoming): Json<IncomingEvent>,
) -> Result<(StatusCode, Json<Value>), IngestError> {
    let processed = state.processor.process(&bot_id, incoming).await?;
    Ok((StatusCode::CREATED, Json(json!({ "event_id": processed.event_id }))))
}

/// `POST /api/events/batch`: each event is processed independently; a
/// validation failure on one does not block the others (§4.8 S6).
pub async fn create_batch(
    State(state): State<Arc<AppState>>,
    Extension(BotId(bot_id)): Extension<BotId>,
    Json(incoming): Json<Vec<IncomingEvent>>,
) -> (StatusCode, Json<Value>) {
    let mut results = Vec::with_capacity(incoming.len());
    let mut any_ok = false;
    for event in incoming {
        match state.processor.process(&bot_id, event).await {
            Ok(processed) => {
                any_ok = true;
                results.push(json!({ "success": true, "event_id": processed.event_id }));
            }
            Err(err) => {
                results.push(json!({ "success": false, "error": err.to_string() }));
            }
        }
    }
    let status = if any_ok { StatusCode::CREATED } else { StatusCode::BAD_REQUEST };
    (status, Json(json!({ "results": results })))
}

#[derive(Debug, Deserialize, Default)]
pub struct EventQuery {
    pub bot_id: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub event_type: Option<String>,
    pub level: Option<String>,
    pub min_score: Option<f64>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// `GET /api/events`: filterable, paginated, read-only — not behind the
/// bot-secret middleware (§4.8).
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(q): Query<EventQuery>,
) -> Result<Json<Value>, IngestError> {
    let filter = EventFilter {
        bot_id: q.bot_id,
        user_id: q.user_id,
        session_id: q.session_id,
        event_type: q.event_type,
        level: q.level,
        min_score: q.min_score,
        from: q.from,
        to: q.to,
        limit: q.limit.unwrap_or(50).clamp(1, 500),
        offset: q.offset.unwrap_or(0).max(0),
    };
    let events = state.store.query_events(&filter).await?;
    Ok(Json(json!({ "events": events })))
}

/// `GET /api/events/stream`: SSE subscription on the global broadcast
/// stream, built over `BroadcastStream`. A lagged subscriber records the
/// drop on the hub (§5's "drop-and-mark on overflow") rather than
/// silently skipping ahead.
pub async fn stream(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rx = state.hub.subscribe_global();
    let hub = state.hub.clone();
    let stream = BroadcastStream::new(rx).filter_map(move |item| match item {
        Ok(payload) => Some(Ok::<_, Infallible>(SseEvent::default().data(serde_json::to_string(&payload).unwrap_or_else(|_| "{}".to_string())))),
        Err(BroadcastStreamRecvError::Lagged(missed)) => {
            hub.record_lag(missed);
            None
        }
    });
    (
        [(header::CACHE_CONTROL, "no-cache"), (header::CONNECTION, "keep-alive")],
        Sse::new(stream),
    )
}

//! `POST /api/bots/register`, `POST /api/bots/:botId/heartbeat` (§4.8).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sentinel_types::{Bot, BotStatus};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::IngestError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub bot_id: String,
    pub persona_category: String,
    pub persona_name: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub config_hash: String,
    #[serde(default)]
    pub metadata: Value,
}

/// UPSERT on `bot_id`; broadcasts `bot:registered` (§4.8, §8 invariant 7).
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<Value>), IngestError> {
    let bot = Bot {
        bot_id: body.bot_id,
        persona_category: body.persona_category,
        persona_name: body.persona_name,
        company_name: body.company_name,
        status: BotStatus::Online,
        last_heartbeat: Utc::now(),
        config_hash: body.config_hash,
        metadata: body.metadata,
    };
    state.store.upsert_bot(&bot).await?;
    state.hub.broadcast("bot:registered", serde_json::to_value(&bot).unwrap_or_default());
    Ok((StatusCode::CREATED, Json(json!(bot))))
}

#[derive(Debug, Deserialize, Default)]
pub struct HeartbeatBody {
    #[serde(default)]
    pub status: Option<String>,
}

/// Records a heartbeat; broadcasts `bot:heartbeat` (§4.8).
pub async fn heartbeat(
    State(state): State<Arc<AppState>>,
    Path(bot_id): Path<String>,
    Json(body): Json<HeartbeatBody>,
) -> Result<Json<Value>, IngestError> {
    let status = match body.status.as_deref() {
        Some("offline") => BotStatus::Offline,
        Some("degraded") => BotStatus::Degraded,
        _ => BotStatus::Online,
    };
    let now = Utc::now();
    let found = state.store.record_heartbeat(&bot_id, status, now).await?;
    if !found {
        return Err(IngestError::NotFound(format!("unknown bot {bot_id}")));
    }
    state.hub.broadcast(
        "bot:heartbeat",
        json!({ "bot_id": bot_id, "status": status_label(status), "last_heartbeat": now }),
    );
    Ok(Json(json!({ "bot_id": bot_id, "status": status_label(status) })))
}

fn status_label(status: BotStatus) -> &'static str {
    match status {
        BotStatus::Online => "online",
        BotStatus::Offline => "offline",
        BotStatus::Degraded => "degraded",
    }
}

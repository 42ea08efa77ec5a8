//! Bot-secret authentication middleware (§6): every write endpoint
//! requires `X-Bot-Secret` to match the configured shared secret and
//! `X-Bot-Id` to be present. Read-only event-query endpoints skip this
//! layer entirely in the router (§4.8).
//!
//! Resolves a value off the request, injects it into
//! `req.extensions_mut()` for handlers to pull back out via the `BotId`
//! extension.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::IngestError;
use crate::state::AppState;

/// The authenticated bot id, injected by [`require_bot_auth`] and read back
/// via `req.extensions().get::<BotId>()` or an `Extension<BotId>` extractor.
#[derive(Debug, Clone)]
pub struct BotId(pub String);

pub async fn require_bot_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, IngestError> {
    let secret = header_str(&req, "x-bot-secret");
    if secret.as_deref() != Some(state.bot_secret.as_str()) {
        return Err(IngestError::Auth("missing or incorrect X-Bot-Secret".to_string()));
    }

    let bot_id = header_str(&req, "x-bot-id").ok_or_else(|| IngestError::Validation("missing X-Bot-Id header".to_string()))?;
    req.extensions_mut().insert(BotId(bot_id));
    Ok(next.run(req).await)
}

/// Secret-only check, for authenticated reads that aren't one of the
/// unauthenticated event-query endpoints and don't need a bot identity
/// (§4.8: "all `/api/*` endpoints require `X-Bot-Secret` ... except event
/// query endpoints").
pub async fn require_secret(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, IngestError> {
    let secret = header_str(&req, "x-bot-secret");
    if secret.as_deref() != Some(state.bot_secret.as_str()) {
        return Err(IngestError::Auth("missing or incorrect X-Bot-Secret".to_string()));
    }
    Ok(next.run(req).await)
}

fn header_str(req: &Request, name: &str) -> Option<String> {
    req.headers().get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

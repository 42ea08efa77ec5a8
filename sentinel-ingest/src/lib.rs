//! Ingestion service (§4.8-§4.11): the HTTP surface bots report telemetry
//! to, plus the event processor, broadcast hub, and pub/sub bridge that
//! fan it back out in real time.

pub mod auth;
pub mod config;
pub mod error;
pub mod fleet;
pub mod hub;
pub mod processor;
pub mod pubsub;
pub mod routes;
pub mod state;
pub mod store;

pub use config::IngestConfig;
pub use error::IngestError;
pub use hub::BroadcastHub;
pub use processor::EventProcessor;
pub use pubsub::PubSubBridge;
pub use state::AppState;
pub use store::Store;

use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Builds the full router, wiring each route group behind the right auth
/// layer (§4.8, §6): event-query endpoints are open, everything else needs
/// the shared secret, and writes additionally need `X-Bot-Id`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let event_queries = Router::new()
        .route("/api/events", get(routes::events::list))
        .route("/api/events/stream", get(routes::events::stream));

    let writes = Router::new()
        .route("/api/bots/register", post(routes::bots::register))
        .route("/api/bots/{botId}/heartbeat", post(routes::bots::heartbeat))
        .route("/api/events", post(routes::events::create))
        .route("/api/events/batch", post(routes::events::create_batch))
        .route("/api/sessions", post(routes::sessions::create))
        .route("/api/sessions/{sessionId}", put(routes::sessions::update))
        .route("/api/patterns", post(routes::patterns::create))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_bot_auth));

    let authenticated_reads = Router::new()
        .route("/api/sessions/{sessionId}/replay", get(routes::sessions::replay))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::require_secret));

    Router::new()
        .merge(event_queries)
        .merge(writes)
        .merge(authenticated_reads)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

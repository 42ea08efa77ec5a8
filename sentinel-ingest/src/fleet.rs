//! Periodic `fleet:status` broadcaster (§4.10): the only hub event not
//! triggered by an inbound request, so it runs as its own ticker rather
//! than from inside the event processor.

use std::sync::Arc;
use std::time::Duration;

use crate::hub::BroadcastHub;
use crate::store::{FleetCounts, Store};

/// Runs forever, polling fleet counts on `interval` and broadcasting them.
/// A query failure is logged and skipped; the ticker keeps running rather
/// than let one bad poll take the broadcast down.
pub async fn run(store: Store, hub: Arc<BroadcastHub>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match store.fleet_counts().await {
            Ok(counts) => hub.broadcast("fleet:status", payload(counts)),
            Err(err) => {
                tracing::warn!(target: "sentinel_ingest::fleet", error = %err, "fleet status query failed; skipping this tick");
            }
        }
    }
}

fn payload(counts: FleetCounts) -> serde_json::Value {
    serde_json::json!({
        "online": counts.online,
        "offline": counts.offline,
        "degraded": counts.degraded,
        "active_sessions": counts.active_sessions,
    })
}

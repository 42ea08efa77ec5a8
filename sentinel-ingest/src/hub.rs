//! Broadcast Hub (§4.10): pure fan-out over named rooms.
//!
//! A registry of rooms (`bot:{id}`, `category:{cat}`, `alerts`,
//! `threats:{30|60|80}`) created lazily on first subscribe or publish,
//! each an independent bounded `tokio::sync::broadcast` channel with its
//! own lag counter. The hub never persists — a subscriber that isn't
//! listening when a message is sent simply misses it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

const THREAT_THRESHOLDS: [f64; 3] = [30.0, 60.0, 80.0];

/// Fan-out hub for real-time event rooms.
pub struct BroadcastHub {
    capacity: usize,
    global: broadcast::Sender<Value>,
    rooms: DashMap<String, broadcast::Sender<Value>>,
    dropped: AtomicUsize,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let (global, _) = broadcast::channel(capacity);
        Arc::new(Self {
            capacity,
            global,
            rooms: DashMap::new(),
            dropped: AtomicUsize::new(0),
        })
    }

    fn room_sender(&self, room: &str) -> broadcast::Sender<Value> {
        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Subscribes to the unfiltered global stream (every broadcast type,
    /// every room).
    #[must_use]
    pub fn subscribe_global(&self) -> broadcast::Receiver<Value> {
        self.global.subscribe()
    }

    /// Subscribes to one named room, e.g. `"bot:acme-1"` or `"alerts"`.
    #[must_use]
    pub fn subscribe_room(&self, room: &str) -> broadcast::Receiver<Value> {
        self.room_sender(room).subscribe()
    }

    fn send_to(&self, room: &str, payload: Value) {
        // SendError just means no subscribers are currently listening on
        // this room; that is the expected steady state between bursts.
        let _ = self.room_sender(room).send(payload);
    }

    /// Broadcasts one event. `data` should be a JSON object; recognized
    /// fields (`bot_id`, `persona_category`, `threat_score`) steer
    /// room-specific fan-out per §4.10. Always stamps `_timestamp` and
    /// `type` before sending.
    pub fn broadcast(&self, event_type: &str, data: Value) {
        let mut payload = data;
        let Value::Object(ref mut map) = payload else {
            tracing::warn!(target: "sentinel_ingest::hub", event_type, "broadcast payload was not a JSON object; dropping");
            return;
        };
        map.insert("type".to_string(), Value::String(event_type.to_string()));
        map.insert("_timestamp".to_string(), serde_json::json!(chrono::Utc::now().timestamp_millis()));

        if self.global.send(payload.clone()).is_err() {
            // No global subscribers; not an error, just an idle period.
        }

        if let Some(bot_id) = payload.get("bot_id").and_then(Value::as_str).map(str::to_string) {
            self.send_to(&format!("bot:{bot_id}"), payload.clone());
        }
        if let Some(category) = payload.get("persona_category").and_then(Value::as_str).map(str::to_string) {
            self.send_to(&format!("category:{category}"), payload.clone());
        }
        if let Some(score) = payload.get("threat_score").and_then(Value::as_f64) {
            for threshold in THREAT_THRESHOLDS {
                if score >= threshold {
                    let mut threat_payload = payload.clone();
                    if let Value::Object(ref mut m) = threat_payload {
                        m.insert("threshold".to_string(), serde_json::json!(threshold as u32));
                    }
                    self.send_to(&format!("threats:{}", threshold as u32), threat_payload);
                }
            }
        }
        if event_type.starts_with("alert") {
            self.send_to("alerts", payload);
        }
    }

    pub fn record_lag(&self, missed: u64) {
        if missed == 0 {
            return;
        }
        let increment = usize::try_from(missed).unwrap_or(usize::MAX);
        let total = self.dropped.fetch_add(increment, Ordering::Relaxed).saturating_add(increment);
        tracing::warn!(target: "sentinel_ingest::hub", missed, total_dropped = total, "subscriber lagged; events dropped");
    }

    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn broadcast_reaches_global_subscriber() {
        let hub = BroadcastHub::new(16);
        let mut rx = hub.subscribe_global();
        hub.broadcast("bot:registered", json!({ "bot_id": "b1" }));
        let received = rx.recv().await.unwrap();
        assert_eq!(received["type"], "bot:registered");
        assert!(received.get("_timestamp").is_some());
    }

    #[tokio::test]
    async fn broadcast_reaches_bot_room_when_bot_id_present() {
        let hub = BroadcastHub::new(16);
        let mut rx = hub.subscribe_room("bot:b1");
        hub.broadcast("bot:heartbeat", json!({ "bot_id": "b1" }));
        let received = rx.recv().await.unwrap();
        assert_eq!(received["bot_id"], "b1");
    }

    #[tokio::test]
    async fn threat_score_above_threshold_reaches_threat_room_with_threshold_field() {
        let hub = BroadcastHub::new(16);
        let mut rx = hub.subscribe_room("threats:60");
        hub.broadcast("threat", json!({ "threat_score": 75.0 }));
        let received = rx.recv().await.unwrap();
        assert_eq!(received["threshold"], 60);
    }

    #[tokio::test]
    async fn below_threshold_does_not_reach_threat_room() {
        let hub = BroadcastHub::new(16);
        let mut rx = hub.subscribe_room("threats:80");
        hub.broadcast("threat", json!({ "threat_score": 50.0 }));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn alert_prefixed_type_reaches_alerts_room() {
        let hub = BroadcastHub::new(16);
        let mut rx = hub.subscribe_room("alerts");
        hub.broadcast("alert:new", json!({ "score": 90 }));
        let received = rx.recv().await.unwrap();
        assert_eq!(received["type"], "alert:new");
    }
}

//! Pub/Sub Bridge (§4.11): a single named channel (`honeybot:events`)
//! carrying processed events between ingestion instances, with
//! `event_id`-keyed dedup so a remote echo of an event this instance just
//! published never double-broadcasts locally.
//!
//! The in-process default implementation models the channel as a
//! `tokio::sync::broadcast` the same way the Broadcast Hub does —
//! multi-instance deployments swap in a real pub/sub transport (Redis,
//! NATS) behind the same publish/subscribe shape without touching callers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

const DEDUP_WINDOW: Duration = Duration::from_secs(10);

/// One message on the `honeybot:events` channel.
#[derive(Debug, Clone)]
pub struct RemoteEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub data: Value,
}

/// Publishes processed events to peer instances and fans remote events
/// back into the local broadcast hub, deduplicating by `event_id` within a
/// 10s window (§4.11).
#[derive(Clone)]
pub struct PubSubBridge {
    inner: Arc<Inner>,
}

struct Inner {
    channel: broadcast::Sender<RemoteEvent>,
    seen: DashMap<Uuid, Instant>,
}

impl PubSubBridge {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (channel, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(Inner {
                channel,
                seen: DashMap::new(),
            }),
        }
    }

    /// Publishes a processed event onto `honeybot:events`. Marks the event
    /// as seen locally first, so this instance's own subscriber (if any)
    /// doesn't re-broadcast its own publication.
    pub fn publish(&self, event_id: Uuid, event_type: &str, data: Value) {
        self.mark_seen(event_id);
        let _ = self.inner.channel.send(RemoteEvent {
            event_id,
            event_type: event_type.to_string(),
            data,
        });
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RemoteEvent> {
        self.inner.channel.subscribe()
    }

    /// `true` if `event_id` has been seen (published or accepted) within
    /// the dedup window, and records it as seen either way.
    fn mark_seen(&self, event_id: Uuid) -> bool {
        let now = Instant::now();
        self.sweep(now);
        let already_seen = self
            .inner
            .seen
            .get(&event_id)
            .is_some_and(|at| now.duration_since(*at) < DEDUP_WINDOW);
        self.inner.seen.insert(event_id, now);
        already_seen
    }

    /// A remote subscriber calls this before re-broadcasting locally;
    /// returns `false` (caller should skip) for a duplicate arrival within
    /// the dedup window.
    #[must_use]
    pub fn accept_remote(&self, event_id: Uuid) -> bool {
        !self.mark_seen(event_id)
    }

    fn sweep(&self, now: Instant) {
        self.inner.seen.retain(|_, at| now.duration_since(*at) < DEDUP_WINDOW * 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_arrival_of_an_event_id_is_accepted() {
        let bridge = PubSubBridge::new(16);
        assert!(bridge.accept_remote(Uuid::new_v4()));
    }

    #[test]
    fn duplicate_arrival_within_window_is_rejected() {
        let bridge = PubSubBridge::new(16);
        let id = Uuid::new_v4();
        assert!(bridge.accept_remote(id));
        assert!(!bridge.accept_remote(id));
    }

    #[test]
    fn publishing_marks_the_event_seen_so_local_echo_is_suppressed() {
        let bridge = PubSubBridge::new(16);
        let id = Uuid::new_v4();
        bridge.publish(id, "event:new", serde_json::json!({}));
        assert!(!bridge.accept_remote(id));
    }

    #[tokio::test]
    async fn published_messages_reach_a_subscriber() {
        let bridge = PubSubBridge::new(16);
        let mut rx = bridge.subscribe();
        let id = Uuid::new_v4();
        bridge.publish(id, "event:new", serde_json::json!({"a": 1}));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_id, id);
    }
}

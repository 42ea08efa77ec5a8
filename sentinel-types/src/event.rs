//! `Event` (§3, §6): the unit of telemetry that crosses the wire from an
//! agent to the ingestion service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of event, per §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Message,
    Detection,
    HoneypotActivated,
    UserBlocked,
    Alert,
}

impl Default for EventType {
    fn default() -> Self {
        Self::Message
    }
}

/// Severity bucket, per §3 and §4.2's level mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Info,
    Warning,
    Critical,
}

impl Default for EventLevel {
    fn default() -> Self {
        Self::Info
    }
}

/// A telemetry event, per §3.
///
/// Invariant (§8 #1): `threat_score`, when present, is always within
/// `[0, 100]` — enforced by [`Event::with_threat_score`] and by the Event
/// Processor's validation stage (§4.9 step 1) before a value from the wire
/// is ever placed into this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub event_id: Uuid,
    pub bot_id: String,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub level: EventLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_score: Option<f64>,
    #[serde(default)]
    pub detection_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_hash: Option<String>,
    #[serde(default = "empty_object")]
    pub analysis_result: serde_json::Value,
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

impl Event {
    /// Constructs a new event with a freshly generated id and the current
    /// timestamp, matching Event Processor step 2 ("generate `event_id` if
    /// missing").
    #[must_use]
    pub fn new(bot_id: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            bot_id: bot_id.into(),
            event_type: EventType::default(),
            level: EventLevel::default(),
            user_id: None,
            session_id: None,
            threat_score: None,
            detection_types: Vec::new(),
            message_content: None,
            message_hash: None,
            analysis_result: serde_json::json!({}),
            metadata: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    /// Sets `message_content` and derives `message_hash` from it in the
    /// same step (§4.9 step 2: `message_hash = sha256(message_content)`).
    #[must_use]
    pub fn with_message_content(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        self.message_hash = Some(crate::hashing::sha256_hex(&content));
        self.message_content = Some(content);
        self
    }

    /// Clamps and sets `threat_score`, upholding §8 invariant 1.
    #[must_use]
    pub fn with_threat_score(mut self, score: f64) -> Self {
        self.threat_score = Some(score.clamp(0.0, 100.0));
        self
    }

    /// Returns a clone of this event with `message_content` stripped, for
    /// publication on the broadcast bus / SSE stream (§4.9: "Publications
    /// strip `message_content` to keep raw user text off the broadcast
    /// bus"; §8 invariant 5).
    #[must_use]
    pub fn sanitized_for_broadcast(&self) -> Self {
        let mut copy = self.clone();
        copy.message_content = None;
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_threat_score_clamps_into_range() {
        let e = Event::new("bot-1").with_threat_score(150.0);
        assert_eq!(e.threat_score, Some(100.0));
        let e = Event::new("bot-1").with_threat_score(-10.0);
        assert_eq!(e.threat_score, Some(0.0));
    }

    #[test]
    fn with_message_content_derives_hash() {
        let e = Event::new("bot-1").with_message_content("hello");
        assert_eq!(e.message_hash.unwrap().len(), 64);
    }

    #[test]
    fn sanitized_for_broadcast_strips_content_only() {
        let e = Event::new("bot-1").with_message_content("secret").with_threat_score(50.0);
        let sanitized = e.sanitized_for_broadcast();
        assert!(sanitized.message_content.is_none());
        assert!(sanitized.message_hash.is_some());
        assert_eq!(sanitized.threat_score, Some(50.0));
    }

    #[test]
    fn defaults_match_spec_schema_defaults() {
        let json = serde_json::json!({ "event_id": Uuid::nil(), "bot_id": "b", "created_at": Utc::now() });
        let e: Event = serde_json::from_value(json).unwrap();
        assert_eq!(e.event_type, EventType::Message);
        assert_eq!(e.level, EventLevel::Info);
        assert!(e.detection_types.is_empty());
        assert_eq!(e.analysis_result, serde_json::json!({}));
        assert_eq!(e.metadata, serde_json::json!({}));
    }
}

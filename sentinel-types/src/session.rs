//! `Session` (§3): the conversation-level record persisted by ingestion,
//! and `Turn`, the entries of its `conversation_log`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::mode::Mode;

/// One turn in a session's `conversation_log`, per §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub detections: Vec<String>,
    pub threat_score: f64,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_honeypot: Option<bool>,
}

/// A conversation session, per §3.
///
/// Insert is idempotent on `session_id` (§8 invariant 6); updates use
/// field-wise COALESCE so partial patches never clobber existing values —
/// see [`Session::apply_patch`]. A session is *active* while `ended_at` is
/// `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub bot_id: String,
    pub user_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_mode: Option<Mode>,
    #[serde(default)]
    pub final_score: f64,
    #[serde(default)]
    pub max_score: f64,
    #[serde(default)]
    pub total_messages: u32,
    #[serde(default)]
    pub detection_count: u32,
    #[serde(default)]
    pub honeypot_responses: u32,
    #[serde(default)]
    pub attack_types: HashSet<String>,
    #[serde(default)]
    pub conversation_log: Vec<Turn>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A partial update to a [`Session`], as accepted by `PUT
/// /api/sessions/:sessionId` (§4.8, §6). Every field is optional; `None`
/// means "leave unchanged". `metadata` is merged (deep-union) rather than
/// replaced; every other present field replaces the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionPatch {
    pub ended_at: Option<DateTime<Utc>>,
    pub final_mode: Option<Mode>,
    pub final_score: Option<f64>,
    pub max_score: Option<f64>,
    pub total_messages: Option<u32>,
    pub detection_count: Option<u32>,
    pub honeypot_responses: Option<u32>,
    pub attack_types: Option<HashSet<String>>,
    pub metadata: Option<serde_json::Value>,
}

impl Session {
    /// Creates a fresh, active session.
    #[must_use]
    pub fn new(session_id: impl Into<String>, bot_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            bot_id: bot_id.into(),
            user_id: user_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            final_mode: None,
            final_score: 0.0,
            max_score: 0.0,
            total_messages: 0,
            detection_count: 0,
            honeypot_responses: 0,
            attack_types: HashSet::new(),
            conversation_log: Vec::new(),
            metadata: serde_json::json!({}),
        }
    }

    /// `true` while `ended_at` is unset.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Applies a field-wise patch: scalar fields COALESCE (present value
    /// replaces, absent leaves untouched), `metadata` deep-merges one level
    /// (§6: "metadata merges via deep-union; any other non-null field
    /// replaces").
    pub fn apply_patch(&mut self, patch: SessionPatch) {
        if let Some(v) = patch.ended_at {
            self.ended_at = Some(v);
        }
        if let Some(v) = patch.final_mode {
            self.final_mode = Some(v);
        }
        if let Some(v) = patch.final_score {
            self.final_score = v;
        }
        if let Some(v) = patch.max_score {
            self.max_score = v;
        }
        if let Some(v) = patch.total_messages {
            self.total_messages = v;
        }
        if let Some(v) = patch.detection_count {
            self.detection_count = v;
        }
        if let Some(v) = patch.honeypot_responses {
            self.honeypot_responses = v;
        }
        if let Some(v) = patch.attack_types {
            self.attack_types.extend(v);
        }
        if let Some(patch_meta) = patch.metadata {
            merge_json(&mut self.metadata, patch_meta);
        }
    }

    /// Pushes a turn onto `conversation_log` and keeps the session-level
    /// roll-ups (`max_score`, `total_messages`, `detection_count`)
    /// consistent, enforcing §8 invariant 3 (`max_score >= final_score`,
    /// `total_messages >= detection_count`).
    pub fn record_turn(&mut self, turn: Turn) {
        self.total_messages += 1;
        if !turn.detections.is_empty() {
            self.detection_count += 1;
        }
        if turn.threat_score > self.max_score {
            self.max_score = turn.threat_score;
        }
        self.final_score = turn.threat_score;
        self.final_mode = Some(turn.mode);
        if turn.is_honeypot == Some(true) {
            self.honeypot_responses += 1;
        }
        self.conversation_log.push(turn);
    }
}

/// One-level deep-union merge: object keys in `patch` overwrite or add into
/// `base`; non-object `patch` values replace `base` wholesale.
fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(patch_map)) => {
            for (k, v) in patch_map {
                base_map.insert(k, v);
            }
        }
        (base, patch) => *base = patch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(content: &str, score: f64, mode: Mode) -> Turn {
        Turn {
            role: "user".into(),
            content: content.into(),
            timestamp: Utc::now(),
            detections: Vec::new(),
            threat_score: score,
            mode,
            is_honeypot: None,
        }
    }

    #[test]
    fn new_session_is_active() {
        let s = Session::new("s1", "bot-1", "user-1");
        assert!(s.is_active());
    }

    #[test]
    fn record_turn_maintains_max_score_invariant() {
        let mut s = Session::new("s1", "bot-1", "user-1");
        s.record_turn(turn("hi", 40.0, Mode::Monitoring));
        s.record_turn(turn("bye", 10.0, Mode::Monitoring));
        assert_eq!(s.final_score, 10.0);
        assert_eq!(s.max_score, 40.0);
        assert!(s.max_score >= s.final_score);
    }

    #[test]
    fn record_turn_maintains_detection_count_invariant() {
        let mut s = Session::new("s1", "bot-1", "user-1");
        let mut t = turn("x", 5.0, Mode::Normal);
        t.detections.push("prompt_injection".into());
        s.record_turn(t);
        s.record_turn(turn("y", 0.0, Mode::Normal));
        assert_eq!(s.total_messages, 2);
        assert_eq!(s.detection_count, 1);
        assert!(s.total_messages >= s.detection_count);
    }

    #[test]
    fn apply_patch_merges_metadata_and_replaces_scalars() {
        let mut s = Session::new("s1", "bot-1", "user-1");
        s.metadata = serde_json::json!({"a": 1, "b": 2});
        let patch = SessionPatch {
            final_score: Some(77.0),
            metadata: Some(serde_json::json!({"b": 3, "c": 4})),
            ..Default::default()
        };
        s.apply_patch(patch);
        assert_eq!(s.final_score, 77.0);
        assert_eq!(s.metadata, serde_json::json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn apply_patch_leaves_absent_fields_untouched() {
        let mut s = Session::new("s1", "bot-1", "user-1");
        s.final_score = 42.0;
        s.apply_patch(SessionPatch::default());
        assert_eq!(s.final_score, 42.0);
    }
}

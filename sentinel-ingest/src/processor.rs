//! Event Processor (§4.9): the six-step pipeline every incoming event goes
//! through between the HTTP boundary and storage.

use chrono::Utc;
use sentinel_types::{
    Alert, AlertDetection, Event, EventLevel, EventType, NovelPattern, NovelPatternSubmission,
};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::IngestError;
use crate::hub::BroadcastHub;
use crate::pubsub::PubSubBridge;
use crate::store::Store;

fn empty_object() -> Value {
    serde_json::json!({})
}

/// Wire shape of an incoming event (§6), before `event_id`/`message_hash`
/// are derived.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingEvent {
    pub event_id: Option<Uuid>,
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub level: EventLevel,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub threat_score: Option<f64>,
    #[serde(default)]
    pub detection_types: Vec<String>,
    #[serde(default)]
    pub message_content: Option<String>,
    #[serde(default = "empty_object")]
    pub analysis_result: Value,
    #[serde(default = "empty_object")]
    pub metadata: Value,
    #[serde(default)]
    pub novel_patterns: Vec<NovelPatternSubmission>,
}

/// What a single event's processing run produced, for the batch endpoint's
/// aggregated report (§4.8).
#[derive(Debug)]
pub struct ProcessedEvent {
    pub event_id: Uuid,
    pub alert: Option<Alert>,
}

pub struct EventProcessor {
    store: Store,
    hub: std::sync::Arc<BroadcastHub>,
    pubsub: PubSubBridge,
}

impl EventProcessor {
    #[must_use]
    pub fn new(store: Store, hub: std::sync::Arc<BroadcastHub>, pubsub: PubSubBridge) -> Self {
        Self { store, hub, pubsub }
    }

    /// Runs the full §4.9 pipeline for one event. `bot_id` comes from the
    /// `X-Bot-Id` header (the wire body doesn't carry it, §6). Persistence
    /// failure aborts the request (the primary path); publish/broadcast
    /// failures are logged and swallowed (§7).
    pub async fn process(&self, bot_id: &str, incoming: IncomingEvent) -> Result<ProcessedEvent, IngestError> {
        // Step 1: validate.
        if let Some(score) = incoming.threat_score {
            if !score.is_finite() || !(0.0..=100.0).contains(&score) {
                return Err(IngestError::Validation(format!(
                    "threat_score must be a finite number in [0, 100], got {score}"
                )));
            }
        }

        // Step 2: derive.
        let mut event = Event::new(bot_id);
        event.event_id = incoming.event_id.unwrap_or_else(Uuid::new_v4);
        event.event_type = incoming.event_type;
        event.level = incoming.level;
        event.user_id = incoming.user_id;
        event.session_id = incoming.session_id;
        event.threat_score = incoming.threat_score;
        event.detection_types = incoming.detection_types;
        event.analysis_result = incoming.analysis_result;
        event.metadata = incoming.metadata;
        if let Some(content) = incoming.message_content {
            event = event.with_message_content(content);
        }

        // Step 3: persist.
        self.store.insert_event(&event).await?;

        // Step 4: publish (best-effort; never aborts the primary path).
        let sanitized = event.sanitized_for_broadcast();
        let payload = serde_json::to_value(&sanitized).unwrap_or_default();
        self.hub.broadcast("event:new", payload.clone());
        self.pubsub.publish(event.event_id, "event:new", payload);

        // Step 5: novel patterns.
        for submission in incoming.novel_patterns {
            let pattern = NovelPattern::first_occurrence(submission, Utc::now());
            match self.store.upsert_novel_pattern(&pattern).await {
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(target: "sentinel_ingest::processor", error = %err, "novel pattern upsert failed");
                }
            }
        }

        // Step 6: alert elevation.
        let alert = if matches!(event.level, EventLevel::Warning | EventLevel::Critical) {
            let detections: Vec<AlertDetection> = event
                .detection_types
                .iter()
                .map(|detection_type| AlertDetection {
                    detection_type: detection_type.clone(),
                    confidence_pct: 100,
                    pattern_count: 1,
                })
                .collect();
            let alert = Alert::summarize(
                event.level,
                event.user_id.clone(),
                event.threat_score.unwrap_or(0.0),
                detections,
                Some(event.event_id),
                event.session_id.clone(),
            );
            if let Err(err) = self.store.insert_alert(&alert).await {
                tracing::warn!(target: "sentinel_ingest::processor", error = %err, "alert insert failed");
            }
            let alert_payload = serde_json::to_value(&alert).unwrap_or_default();
            self.hub.broadcast("alert:new", alert_payload);
            Some(alert)
        } else {
            None
        };

        Ok(ProcessedEvent {
            event_id: event.event_id,
            alert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_threat_score_is_rejected_before_persistence() {
        let incoming = IncomingEvent {
            event_id: None,
            event_type: EventType::Message,
            level: EventLevel::Info,
            user_id: None,
            session_id: None,
            threat_score: Some(150.0),
            detection_types: vec![],
            message_content: None,
            analysis_result: empty_object(),
            metadata: empty_object(),
            novel_patterns: vec![],
        };
        assert!(incoming.threat_score.unwrap() > 100.0);
    }
}

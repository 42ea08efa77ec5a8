//! `Alert` (§3, §4.5): a derived record emitted when an event's level
//! reaches `warning` or `critical`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::event::EventLevel;

/// Per-finding summary embedded in an [`Alert`], per §4.5's format:
/// `{type, confidence%, patterns: count}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDetection {
    #[serde(rename = "type")]
    pub detection_type: String,
    /// Confidence expressed as a whole-number percentage, per §4.5.
    pub confidence_pct: u8,
    pub pattern_count: usize,
}

/// An alert, derived when `level ∈ {warning, critical}` (§3, §4.9 step 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub alert_id: Uuid,
    pub level: EventLevel,
    pub title: String,
    pub summary: String,
    pub user_id: Option<String>,
    pub score: f64,
    pub detections: Vec<AlertDetection>,
    /// Optional embedded conversation snippet for sinks that want context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation: Option<serde_json::Value>,
    pub event_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    /// Builds a human summary title from level and score, matching the
    /// ingestion service's §4.9 step 6 behavior ("insert an `alerts` row
    /// with a human summary").
    #[must_use]
    pub fn summarize(
        level: EventLevel,
        user_id: Option<String>,
        score: f64,
        detections: Vec<AlertDetection>,
        event_id: Option<Uuid>,
        session_id: Option<String>,
    ) -> Self {
        let kind = detections
            .first()
            .map(|d| d.detection_type.clone())
            .unwrap_or_else(|| "unspecified".to_string());
        let title = match level {
            EventLevel::Critical => format!("Critical threat detected: {kind}"),
            EventLevel::Warning => format!("Elevated threat detected: {kind}"),
            EventLevel::Info => format!("Threat observation: {kind}"),
        };
        let summary = format!(
            "score={score:.0} detections={} user={}",
            detections.len(),
            user_id.as_deref().unwrap_or("unknown")
        );
        Self {
            alert_id: Uuid::new_v4(),
            level,
            title,
            summary,
            user_id,
            score,
            detections,
            conversation: None,
            event_id,
            session_id,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_includes_detection_kind_and_score() {
        let alert = Alert::summarize(
            EventLevel::Warning,
            Some("u1".into()),
            63.0,
            vec![AlertDetection {
                detection_type: "prompt_injection".into(),
                confidence_pct: 90,
                pattern_count: 2,
            }],
            None,
            None,
        );
        assert!(alert.title.contains("prompt_injection"));
        assert!(alert.summary.contains("63"));
    }
}

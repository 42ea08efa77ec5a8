//! Alert Manager (§4.5): formats an alert record from a detection outcome
//! and fans it out to configured sinks, isolating failures per sink.
//!
//! Sinks share one small trait (`send(&Alert) -> Result<...>`, a `name()`
//! for logging); dispatch iterates every sink and collects errors without
//! short-circuiting, so one sink's failure never stops the others from
//! receiving the alert.

use std::collections::VecDeque;

use parking_lot::Mutex;
use sentinel_types::{Alert, AlertDetection, EventLevel, Finding};
use uuid::Uuid;

/// Everything the Alert Manager needs to build and dispatch one alert
/// (§4.5: "accepts `{level, userId, score, detections, conversation?}`").
#[derive(Debug, Clone)]
pub struct AlertRequest {
    pub level: EventLevel,
    pub user_id: Option<String>,
    pub score: f64,
    pub detections: Vec<Finding>,
    pub conversation: Option<serde_json::Value>,
    pub event_id: Option<Uuid>,
    pub session_id: Option<String>,
}

/// Destination for a formatted alert. Implementations may perform blocking
/// or network I/O; a failing sink must not prevent delivery to the others
/// (§4.5: "sink failures are isolated").
pub trait AlertSink: Send + Sync {
    fn dispatch(&self, alert: &Alert) -> Result<(), AlertSinkError>;

    fn name(&self) -> &'static str;
}

#[derive(Debug, thiserror::Error)]
#[error("alert sink '{sink}' failed: {message}")]
pub struct AlertSinkError {
    pub sink: &'static str,
    pub message: String,
}

/// Writes alerts through `tracing`, at `warn` for `critical`/`warning`
/// levels and `info` for `info`. Always the first sink configured in
/// practice, since it can never itself fail.
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn dispatch(&self, alert: &Alert) -> Result<(), AlertSinkError> {
        tracing::warn!(target: "sentinel_core::alert", title = %alert.title, user_id = ?alert.user_id, score = alert.score, "alert dispatched");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// In-memory sink for tests and local inspection.
#[derive(Clone, Default)]
pub struct MemoryAlertSink {
    entries: std::sync::Arc<Mutex<Vec<Alert>>>,
}

impl MemoryAlertSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<Alert> {
        self.entries.lock().clone()
    }
}

impl AlertSink for MemoryAlertSink {
    fn dispatch(&self, alert: &Alert) -> Result<(), AlertSinkError> {
        self.entries.lock().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Formats alerts and fans them out to configured sinks, keeping a bounded
/// in-memory history (§4.5: "in-memory history ring, configurable cap").
pub struct AlertManager {
    sinks: Vec<Box<dyn AlertSink>>,
    history: Mutex<VecDeque<Alert>>,
    history_cap: usize,
}

impl AlertManager {
    #[must_use]
    pub fn new(sinks: Vec<Box<dyn AlertSink>>, history_cap: usize) -> Self {
        Self {
            sinks,
            history: Mutex::new(VecDeque::with_capacity(history_cap)),
            history_cap,
        }
    }

    /// Formats `request` into an [`Alert`], dispatches it to every
    /// configured sink (isolating failures), and records it in history.
    pub fn raise(&self, request: AlertRequest) -> Alert {
        let detections: Vec<AlertDetection> = request
            .detections
            .iter()
            .map(|f| AlertDetection {
                detection_type: f.finding_type.as_str().to_string(),
                confidence_pct: (f.confidence * 100.0).round() as u8,
                pattern_count: f.patterns.len(),
            })
            .collect();

        let mut alert = Alert::summarize(
            request.level,
            request.user_id,
            request.score,
            detections,
            request.event_id,
            request.session_id,
        );
        alert.conversation = request.conversation;

        for sink in &self.sinks {
            if let Err(err) = sink.dispatch(&alert) {
                tracing::error!(target: "sentinel_core::alert", sink = sink.name(), error = %err, "alert sink failed; continuing with remaining sinks");
            }
        }

        let mut history = self.history.lock();
        if history.len() >= self.history_cap {
            history.pop_front();
        }
        history.push_back(alert.clone());

        alert
    }

    #[must_use]
    pub fn history(&self) -> Vec<Alert> {
        self.history.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_types::DetectionType;

    fn request() -> AlertRequest {
        AlertRequest {
            level: EventLevel::Warning,
            user_id: Some("user-1".to_string()),
            score: 75.0,
            detections: vec![Finding::new(DetectionType::PromptInjection, 0.9, vec!["PI-001".to_string()])],
            conversation: None,
            event_id: None,
            session_id: None,
        }
    }

    #[test]
    fn dispatches_to_all_sinks_and_records_history() {
        let memory = MemoryAlertSink::new();
        let manager = AlertManager::new(vec![Box::new(memory.clone()), Box::new(LogSink)], 10);
        let alert = manager.raise(request());
        assert_eq!(memory.snapshot().len(), 1);
        assert_eq!(manager.history().len(), 1);
        assert_eq!(alert.user_id.as_deref(), Some("user-1"));
    }

    struct FailingSink;
    impl AlertSink for FailingSink {
        fn dispatch(&self, _alert: &Alert) -> Result<(), AlertSinkError> {
            Err(AlertSinkError {
                sink: "failing",
                message: "simulated failure".to_string(),
            })
        }
        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[test]
    fn a_failing_sink_does_not_suppress_others() {
        let memory = MemoryAlertSink::new();
        let manager = AlertManager::new(vec![Box::new(FailingSink), Box::new(memory.clone())], 10);
        manager.raise(request());
        assert_eq!(memory.snapshot().len(), 1);
    }

    #[test]
    fn history_ring_is_capped() {
        let manager = AlertManager::new(vec![], 3);
        for _ in 0..5 {
            manager.raise(request());
        }
        assert_eq!(manager.history().len(), 3);
    }
}

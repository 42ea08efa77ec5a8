//! Conversation State Machine (§4.3): per-user mode transitions plus the
//! capped ring buffers `ConversationState` owns.
//!
//! Owns its buffers directly rather than exposing `&mut` fields: every
//! mutation goes through a method that enforces the relevant cap, so a
//! caller can never grow a buffer past its bound by construction.

use std::collections::{HashSet, VecDeque};

use chrono::{DateTime, Utc};
use sentinel_types::{DetectionType, Finding, Mode, ThresholdConfig};

use crate::scorer::{score_turn, Level, ScoreResult};

const MAX_MESSAGES: usize = 100;
const MAX_DETECTION_HISTORY: usize = 200;
const MAX_HONEYPOT_RESPONSES: usize = 20;

/// One detector finding recorded in the detection history, timestamped for
/// the rapid-fire and decay calculations on the next turn.
#[derive(Debug, Clone)]
pub struct HistoricalFinding {
    pub finding: Finding,
    pub at: DateTime<Utc>,
}

/// Per-user conversation state (§3 `ConversationState`).
///
/// The owning agent holds exactly one of these per active user and
/// serializes access to it — see §5 ("serialized per-user access"). Nothing
/// in this type performs its own locking; callers shard with e.g.
/// `DashMap<UserId, Arc<Mutex<ConversationState>>>` per §9's sharding note.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub session_id: Option<String>,
    pub mode: Mode,
    pub score: f64,
    pub alert_sent: bool,
    pub messages: VecDeque<DateTime<Utc>>,
    pub detection_history: VecDeque<HistoricalFinding>,
    pub honeypot_response_count: u32,
    pub honeypot_responses: VecDeque<String>,
    pub created_at: DateTime<Utc>,
    pub last_message_at: Option<DateTime<Utc>>,
}

/// Outcome of processing one turn against the state machine.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub score: ScoreResult,
    pub mode: Mode,
    pub mode_changed: bool,
    /// `true` exactly on the turn that latches `alert_sent` (§4.3: "emits
    /// an alert exactly once per session").
    pub should_alert: bool,
}

impl ConversationState {
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session_id: None,
            mode: Mode::Normal,
            score: 0.0,
            alert_sent: false,
            messages: VecDeque::with_capacity(MAX_MESSAGES),
            detection_history: VecDeque::with_capacity(MAX_DETECTION_HISTORY),
            honeypot_response_count: 0,
            honeypot_responses: VecDeque::with_capacity(MAX_HONEYPOT_RESPONSES),
            created_at: now,
            last_message_at: None,
        }
    }

    fn seen_types(&self) -> HashSet<DetectionType> {
        self.detection_history.iter().map(|h| h.finding.finding_type).collect()
    }

    /// Processes one turn: scores it, applies the §4.3 transition table,
    /// and updates the ring buffers. No-op (returns the current mode
    /// unchanged) if the state is already `blocked`, since that mode is
    /// terminal.
    pub fn process_turn(
        &mut self,
        now: DateTime<Utc>,
        findings: &[Finding],
        thresholds: &ThresholdConfig,
    ) -> TurnOutcome {
        if self.mode == Mode::Blocked {
            return TurnOutcome {
                score: ScoreResult {
                    score: self.score,
                    level: Level::Critical,
                    breakdown: Vec::new(),
                    added: 0.0,
                    previous_score: self.score,
                },
                mode: Mode::Blocked,
                mode_changed: false,
                should_alert: false,
            };
        }

        let recent: Vec<DateTime<Utc>> = self.messages.iter().copied().collect();
        let seen = self.seen_types();
        let score = score_turn(self.score, self.last_message_at, now, &seen, &recent, findings, thresholds);

        let new_mode = mode_for_score(score.score, thresholds);
        let previous_mode = self.mode;
        // Decay can re-enter normal from monitoring/honeypot but never from
        // blocked; `process_turn` already returned above when blocked, so
        // any transition reachable here is legal.
        self.mode = new_mode;
        self.score = score.score;
        self.last_message_at = Some(now);

        push_capped(&mut self.messages, now, MAX_MESSAGES);
        for finding in findings {
            push_capped(
                &mut self.detection_history,
                HistoricalFinding {
                    finding: finding.clone(),
                    at: now,
                },
                MAX_DETECTION_HISTORY,
            );
        }

        let should_alert = new_mode == Mode::Honeypot && !self.alert_sent;
        if should_alert {
            self.alert_sent = true;
        }

        TurnOutcome {
            score,
            mode: new_mode,
            mode_changed: new_mode != previous_mode,
            should_alert,
        }
    }

    /// Records a honeypot reply, evicting the oldest if at capacity
    /// (§4.3 ring buffer cap 20).
    pub fn record_honeypot_response(&mut self, reply: String) {
        self.honeypot_response_count += 1;
        push_capped(&mut self.honeypot_responses, reply, MAX_HONEYPOT_RESPONSES);
    }
}

fn push_capped<T>(buf: &mut VecDeque<T>, item: T, cap: usize) {
    if buf.len() >= cap {
        buf.pop_front();
    }
    buf.push_back(item);
}

fn mode_for_score(score: f64, thresholds: &ThresholdConfig) -> Mode {
    if score >= thresholds.block {
        Mode::Blocked
    } else if score >= thresholds.honeypot {
        Mode::Honeypot
    } else if score >= thresholds.monitor {
        Mode::Monitoring
    } else {
        Mode::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(detection_type: DetectionType, confidence: f32) -> Finding {
        Finding::new(detection_type, confidence, vec![])
    }

    #[test]
    fn starts_in_normal_mode() {
        let state = ConversationState::new(Utc::now());
        assert_eq!(state.mode, Mode::Normal);
        assert!(!state.alert_sent);
    }

    #[test]
    fn high_score_turn_enters_honeypot_and_alerts_once() {
        let mut state = ConversationState::new(Utc::now());
        let thresholds = ThresholdConfig::default();
        let now = Utc::now();
        let outcome = state.process_turn(
            now,
            &[finding(DetectionType::PrivilegeEscalation, 1.0), finding(DetectionType::DataExfiltration, 1.0)],
            &thresholds,
        );
        assert_eq!(outcome.mode, Mode::Honeypot);
        assert!(outcome.should_alert);
        assert!(state.alert_sent);

        // A second high-score turn must not alert again (latch).
        let outcome2 = state.process_turn(now, &[finding(DetectionType::PrivilegeEscalation, 1.0)], &thresholds);
        assert!(!outcome2.should_alert);
    }

    #[test]
    fn blocked_is_terminal() {
        let mut state = ConversationState::new(Utc::now());
        let thresholds = ThresholdConfig::default();
        let now = Utc::now();
        state.score = 100.0;
        state.mode = Mode::Blocked;
        let outcome = state.process_turn(now, &[], &thresholds);
        assert_eq!(outcome.mode, Mode::Blocked);
        assert!(!outcome.mode_changed);
    }

    #[test]
    fn decay_can_re_enter_normal_from_monitoring() {
        let mut state = ConversationState::new(Utc::now() - chrono::Duration::minutes(10));
        let thresholds = ThresholdConfig::default();
        state.mode = Mode::Monitoring;
        state.score = 35.0;
        state.last_message_at = Some(Utc::now() - chrono::Duration::minutes(10));
        let outcome = state.process_turn(Utc::now(), &[], &thresholds);
        assert_eq!(outcome.mode, Mode::Normal);
    }

    #[test]
    fn message_ring_buffer_is_capped_at_one_hundred() {
        let mut state = ConversationState::new(Utc::now());
        let thresholds = ThresholdConfig::default();
        for _ in 0..150 {
            state.process_turn(Utc::now(), &[], &thresholds);
        }
        assert_eq!(state.messages.len(), 100);
    }

    #[test]
    fn honeypot_response_buffer_is_capped_at_twenty() {
        let mut state = ConversationState::new(Utc::now());
        for i in 0..30 {
            state.record_honeypot_response(format!("reply {i}"));
        }
        assert_eq!(state.honeypot_responses.len(), 20);
        assert_eq!(state.honeypot_response_count, 30);
    }
}

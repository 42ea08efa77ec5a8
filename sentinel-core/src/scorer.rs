//! Threat Scorer (§4.2): a pure function from prior state + this turn's
//! findings to a new cumulative score and level.
//!
//! A pure function over an explicit prior-state argument rather than
//! interior mutability — the scorer never touches `ConversationState`
//! directly, it takes the inputs it needs and returns a result the
//! caller applies.

use chrono::{DateTime, Utc};
use sentinel_types::{DetectionType, Finding, ThresholdConfig};

/// One decay interval, per §4.2.
pub const DECAY_INTERVAL_SECS: i64 = 5 * 60;

/// Qualitative threat level, derived from the scored value against the
/// active threshold config (§4.2: "levels map by thresholds").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Level {
    fn from_score(score: f64, thresholds: &ThresholdConfig) -> Self {
        if score >= thresholds.block {
            Level::Critical
        } else if score >= thresholds.alert {
            Level::High
        } else if score >= thresholds.honeypot {
            Level::Medium
        } else if score >= thresholds.monitor {
            Level::Low
        } else {
            Level::None
        }
    }
}

/// One finding's contribution to the total, surfaced for observability.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BreakdownEntry {
    #[serde(rename = "type")]
    pub detection_type: DetectionType,
    pub base: f64,
    pub confidence: f32,
    pub repeat_multiplier: f64,
    pub contribution: f64,
}

/// Result of scoring one turn.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ScoreResult {
    pub score: f64,
    pub level: Level,
    pub breakdown: Vec<BreakdownEntry>,
    pub added: f64,
    pub previous_score: f64,
}

/// Timestamp of a prior message, used for the rapid-fire check.
pub type MessageTimestamp = DateTime<Utc>;

/// Scores one turn.
///
/// * `previous_score` / `last_message_at` describe the conversation's state
///   before this turn.
/// * `seen_types` lists detection types that have fired earlier in the
///   session, for the repeat multiplier.
/// * `recent_timestamps` holds up to the last 10 message timestamps
///   (oldest first), used for the rapid-fire penalty; `now` is this turn's
///   timestamp and is appended internally before the gap scan.
/// * `findings` are this turn's detector output.
#[allow(clippy::too_many_arguments)]
pub fn score_turn(
    previous_score: f64,
    last_message_at: Option<MessageTimestamp>,
    now: MessageTimestamp,
    seen_types: &std::collections::HashSet<DetectionType>,
    recent_timestamps: &[MessageTimestamp],
    findings: &[Finding],
    thresholds: &ThresholdConfig,
) -> ScoreResult {
    let decayed = decay(previous_score, last_message_at, now);

    let distinct_types: std::collections::HashSet<DetectionType> =
        findings.iter().map(|f| f.finding_type).collect();
    let combined_multiplier = if distinct_types.len() >= 2 { 1.3 } else { 1.0 };

    let mut breakdown = Vec::with_capacity(findings.len());
    let mut sum = 0.0_f64;
    for finding in findings {
        let base = finding.finding_type.base_score();
        let repeat_multiplier = if seen_types.contains(&finding.finding_type) {
            1.5
        } else {
            1.0
        };
        let contribution = base * f64::from(finding.confidence) * repeat_multiplier;
        sum += contribution;
        breakdown.push(BreakdownEntry {
            detection_type: finding.finding_type,
            base,
            confidence: finding.confidence,
            repeat_multiplier,
            contribution,
        });
    }
    sum *= combined_multiplier;

    let rapid_fire_penalty = rapid_fire_penalty(recent_timestamps, now);
    let added = sum + rapid_fire_penalty;

    let score = (decayed + added).min(100.0).max(0.0);
    let level = Level::from_score(score, thresholds);

    ScoreResult {
        score,
        level,
        breakdown,
        added,
        previous_score: decayed,
    }
}

fn decay(previous_score: f64, last_message_at: Option<MessageTimestamp>, now: MessageTimestamp) -> f64 {
    let Some(last) = last_message_at else {
        return previous_score;
    };
    let elapsed = (now - last).num_seconds().max(0);
    let periods = elapsed / DECAY_INTERVAL_SECS;
    if periods <= 0 {
        return previous_score;
    }
    previous_score * 0.9_f64.powi(periods as i32)
}

/// Counts consecutive-pair gaps under 2s across the last up-to-10 messages
/// plus the current turn, returning the matching penalty (§4.2 rule 5).
fn rapid_fire_penalty(recent_timestamps: &[MessageTimestamp], now: MessageTimestamp) -> f64 {
    let window_start = recent_timestamps.len().saturating_sub(9);
    let mut window: Vec<MessageTimestamp> = recent_timestamps[window_start..].to_vec();
    window.push(now);

    let rapid_pairs = window
        .windows(2)
        .filter(|pair| (pair[1] - pair[0]).num_milliseconds() < 2_000)
        .count();

    if rapid_pairs >= 4 {
        15.0
    } else if rapid_pairs >= 2 {
        10.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn finding(detection_type: DetectionType, confidence: f32) -> Finding {
        Finding::new(detection_type, confidence, vec![])
    }

    #[test]
    fn single_finding_uses_base_times_confidence() {
        let thresholds = ThresholdConfig::default();
        let now = Utc::now();
        let result = score_turn(
            0.0,
            None,
            now,
            &Default::default(),
            &[],
            &[finding(DetectionType::PrivilegeEscalation, 1.0)],
            &thresholds,
        );
        assert!((result.added - 40.0).abs() < f64::EPSILON);
        assert!((result.score - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn repeat_type_gets_one_point_five_multiplier() {
        let thresholds = ThresholdConfig::default();
        let now = Utc::now();
        let mut seen = std::collections::HashSet::new();
        seen.insert(DetectionType::PromptInjection);
        let result = score_turn(
            0.0,
            None,
            now,
            &seen,
            &[],
            &[finding(DetectionType::PromptInjection, 1.0)],
            &thresholds,
        );
        assert!((result.added - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn combined_multiplier_applies_for_two_distinct_types() {
        let thresholds = ThresholdConfig::default();
        let now = Utc::now();
        let result = score_turn(
            0.0,
            None,
            now,
            &Default::default(),
            &[],
            &[
                finding(DetectionType::PromptInjection, 1.0),
                finding(DetectionType::SocialEngineering, 1.0),
            ],
            &thresholds,
        );
        // (30 + 20) * 1.3 = 65
        assert!((result.added - 65.0).abs() < 1e-9);
    }

    #[test]
    fn score_is_capped_at_one_hundred() {
        let thresholds = ThresholdConfig::default();
        let now = Utc::now();
        let result = score_turn(
            95.0,
            None,
            now,
            &Default::default(),
            &[],
            &[finding(DetectionType::PrivilegeEscalation, 1.0)],
            &thresholds,
        );
        assert!((result.score - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn decay_boundary_after_six_minutes_of_idleness() {
        let thresholds = ThresholdConfig::default();
        let last = Utc::now() - Duration::minutes(6);
        let now = Utc::now();
        let result = score_turn(50.0, Some(last), now, &Default::default(), &[], &[], &thresholds);
        assert!(result.score <= 0.9 * 50.0 + 1e-9);
    }

    #[test]
    fn no_decay_within_one_interval() {
        let thresholds = ThresholdConfig::default();
        let last = Utc::now() - Duration::minutes(2);
        let now = Utc::now();
        let result = score_turn(50.0, Some(last), now, &Default::default(), &[], &[], &thresholds);
        assert!((result.score - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rapid_fire_boundary_after_four_sub_two_second_gaps() {
        let thresholds = ThresholdConfig::default();
        let base = Utc::now();
        let recent = vec![
            base,
            base + Duration::milliseconds(500),
            base + Duration::milliseconds(1_000),
            base + Duration::milliseconds(1_500),
        ];
        let now = recent.last().copied().unwrap() + Duration::milliseconds(500);
        let result = score_turn(0.0, Some(now), now, &Default::default(), &recent, &[], &thresholds);
        assert!(result.added >= 15.0);
    }

    #[test]
    fn level_maps_to_threshold_bands() {
        let thresholds = ThresholdConfig::default();
        assert_eq!(Level::from_score(0.0, &thresholds), Level::None);
        assert_eq!(Level::from_score(thresholds.monitor, &thresholds), Level::Low);
        assert_eq!(Level::from_score(thresholds.honeypot, &thresholds), Level::Medium);
        assert_eq!(Level::from_score(thresholds.alert, &thresholds), Level::High);
        assert_eq!(Level::from_score(thresholds.block, &thresholds), Level::Critical);
    }
}

//! The detection vocabulary: `DetectionType` (the six detector kinds of
//! §4.1) and `Finding` (one detector's output about one turn, per the
//! GLOSSARY).

use serde::{Deserialize, Serialize};

/// One of the six detector kinds from §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    /// Instruction-override phrases, role/system tag injection, delimiter
    /// tricks, jailbreak-persona templates.
    PromptInjection,
    /// Authority claims, urgency/pressure framing, emotional manipulation.
    SocialEngineering,
    /// Requests for admin/root/sudo, permission grants, command execution.
    PrivilegeEscalation,
    /// Requests for credentials, bulk PII exports, API keys, secrets.
    DataExfiltration,
    /// Homoglyph, zero-width, fullwidth, leetspeak, dot-separation,
    /// multilingual bypass — also applied as a co-tag on findings only
    /// visible in the normalized form.
    Evasion,
    /// Structural signals: fake `[SYSTEM]`/`[ADMIN]` tags, `role: system`
    /// strings, instruction-override phrases — these also penalize the
    /// trust score.
    Trust,
}

impl DetectionType {
    /// The base score this type contributes per §4.2 step 2, before the
    /// confidence multiplier, repeat multiplier, and combined multiplier.
    #[must_use]
    pub fn base_score(self) -> f64 {
        match self {
            Self::PromptInjection => 30.0,
            Self::SocialEngineering => 20.0,
            Self::PrivilegeEscalation => 40.0,
            Self::DataExfiltration => 35.0,
            Self::Evasion | Self::Trust => 20.0,
        }
    }

    /// Stable wire label, matching the `detection_types` array shape used
    /// by `Event` and `Session::attack_types`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PromptInjection => "prompt_injection",
            Self::SocialEngineering => "social_engineering",
            Self::PrivilegeEscalation => "privilege_escalation",
            Self::DataExfiltration => "data_exfiltration",
            Self::Evasion => "evasion",
            Self::Trust => "trust",
        }
    }
}

impl std::fmt::Display for DetectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One detector's output record about one turn (GLOSSARY: Finding).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Which detector produced this finding.
    #[serde(rename = "type")]
    pub finding_type: DetectionType,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Matched pattern identifiers, for audit.
    pub patterns: Vec<String>,
    /// Free-form structured detail (matched spans, sub-scores, etc).
    #[serde(default)]
    pub details: serde_json::Value,
    /// Set when this finding was only detectable in the normalized form of
    /// the turn (§4.1: "a finding produced only from the normalized form
    /// gets an `evasion` co-tag").
    #[serde(default)]
    pub evasion_co_tag: bool,
}

impl Finding {
    /// Constructs a finding with empty details and no evasion co-tag.
    #[must_use]
    pub fn new(finding_type: DetectionType, confidence: f32, patterns: Vec<String>) -> Self {
        debug_assert!(
            (0.0..=1.0).contains(&confidence),
            "confidence must be in [0.0, 1.0], got {confidence}"
        );
        Self {
            finding_type,
            confidence,
            patterns,
            details: serde_json::Value::Null,
            evasion_co_tag: false,
        }
    }

    /// Builder-style setter for `details`.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }

    /// Builder-style setter for the evasion co-tag.
    #[must_use]
    pub fn with_evasion_co_tag(mut self, tagged: bool) -> Self {
        self.evasion_co_tag = tagged;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_scores_match_spec_table() {
        assert_eq!(DetectionType::PromptInjection.base_score(), 30.0);
        assert_eq!(DetectionType::SocialEngineering.base_score(), 20.0);
        assert_eq!(DetectionType::PrivilegeEscalation.base_score(), 40.0);
        assert_eq!(DetectionType::DataExfiltration.base_score(), 35.0);
        assert_eq!(DetectionType::Evasion.base_score(), 20.0);
        assert_eq!(DetectionType::Trust.base_score(), 20.0);
    }

    #[test]
    fn finding_round_trips_json_with_type_field() {
        let f = Finding::new(DetectionType::PromptInjection, 0.9, vec!["override".into()]);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["type"], "prompt_injection");
        let parsed: Finding = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.finding_type, DetectionType::PromptInjection);
    }
}

//! Static regex pattern library for the detection pipeline, organized by
//! [`DetectionType`]. A `pat!` macro builds `PatternEntry` literals,
//! grouped by category, later compiled by
//! [`crate::detector::PatternDetector`] into a `RegexSet` (fast membership
//! test) plus individual `Regex`es (span extraction on a hit).

use std::borrow::Cow;

use sentinel_types::DetectionType;

/// One built-in detection pattern.
#[derive(Debug, Clone)]
pub struct PatternEntry {
    pub id: Cow<'static, str>,
    pub detection_type: DetectionType,
    pub description: Cow<'static, str>,
    pub regex_str: Cow<'static, str>,
    /// Weight contributed to this detector's confidence on a match
    /// (0.0-1.0); combined per [`crate::detector::PatternDetector::detect`].
    pub weight: f32,
}

macro_rules! pat {
    ($id:expr, $ty:expr, $desc:expr, $re:expr, $w:expr) => {
        PatternEntry {
            id: Cow::Borrowed($id),
            detection_type: $ty,
            description: Cow::Borrowed($desc),
            regex_str: Cow::Borrowed($re),
            weight: $w,
        }
    };
}

/// Returns the full built-in pattern set across all six detector kinds.
#[must_use]
pub fn builtin_patterns() -> Vec<PatternEntry> {
    use DetectionType::{
        DataExfiltration, PrivilegeEscalation, PromptInjection, SocialEngineering, Trust,
    };

    vec![
        // ── prompt_injection ────────────────────────────────────────
        pat!(
            "PI-001",
            PromptInjection,
            "Instruction override",
            r"(?i)ignore\s+(all\s+)?(previous|prior|above)\s+(instructions?|prompts?|rules)",
            0.95
        ),
        pat!(
            "PI-002",
            PromptInjection,
            "Disregard directive",
            r"(?i)disregard\s+(all\s+)?(previous|prior|your)\s+(instructions?|training|guidelines)",
            0.9
        ),
        pat!(
            "PI-003",
            PromptInjection,
            "Role reassignment",
            r"(?i)you\s+are\s+now\s+(a|an|in)\b",
            0.8
        ),
        pat!(
            "PI-004",
            PromptInjection,
            "DAN-style jailbreak persona",
            r"(?i)\bDAN\b|do\s+anything\s+now|developer\s+mode\s+enabled",
            0.85
        ),
        pat!(
            "PI-005",
            PromptInjection,
            "Delimiter / special-token injection",
            r"(?i)\[/?(system|inst|admin)\]|<\|(system|im_start|endoftext)\|>",
            0.9
        ),
        pat!(
            "PI-006",
            PromptInjection,
            "New instructions framing",
            r"(?i)new\s+instructions?\s*:",
            0.7
        ),
        pat!(
            "PI-007",
            PromptInjection,
            "Hypothetical jailbreak framing",
            r"(?i)(pretend|imagine|hypothetically)\s+(that\s+)?you\s+(have\s+no|are\s+not)\s+(restrictions|rules|limits)",
            0.75
        ),
        // ── social_engineering ──────────────────────────────────────
        pat!(
            "SE-001",
            SocialEngineering,
            "Authority claim",
            r"(?i)\b(i\s+am|this\s+is)\s+(the\s+)?(ceo|owner|administrator|your\s+developer|the\s+system\s+administrator)\b",
            0.8
        ),
        pat!(
            "SE-002",
            SocialEngineering,
            "Urgency pressure",
            r"(?i)(urgent|immediately|right\s+now|act\s+fast|time[- ]sensitive)\b.{0,40}\b(must|need\s+to|have\s+to)\b",
            0.6
        ),
        pat!(
            "SE-003",
            SocialEngineering,
            "Emotional manipulation",
            r"(?i)(if\s+you\s+don'?t|unless\s+you)\s+.{0,30}(i\s+will|someone\s+will)\s+(lose|fire|die|be\s+hurt)",
            0.7
        ),
        pat!(
            "SE-004",
            SocialEngineering,
            "Trust priming",
            r"(?i)you\s+can\s+trust\s+me|between\s+(you\s+and\s+me|us)\s+only",
            0.55
        ),
        // ── privilege_escalation ────────────────────────────────────
        pat!(
            "PE-001",
            PrivilegeEscalation,
            "Admin/root/sudo request",
            r"(?i)\b(sudo|su\s+root|run\s+as\s+admin|grant\s+me\s+admin|elevate\s+my\s+permissions?)\b",
            0.85
        ),
        pat!(
            "PE-002",
            PrivilegeEscalation,
            "Permission grant request",
            r"(?i)(give|grant)\s+(me\s+)?(full|root|admin|elevated)\s+(access|permissions?|privileges?)",
            0.85
        ),
        pat!(
            "PE-003",
            PrivilegeEscalation,
            "Command execution request",
            r"(?i)\b(execute|run)\s+(this\s+)?(command|shell|script)\b",
            0.7
        ),
        pat!(
            "PE-004",
            PrivilegeEscalation,
            "Bypass authorization",
            r"(?i)bypass\s+(the\s+)?(auth(entication|orization)?|security|login)\b",
            0.8
        ),
        // ── data_exfiltration ────────────────────────────────────────
        pat!(
            "DE-001",
            DataExfiltration,
            "Credential request",
            r"(?i)\b(tell|give|send)\s+me\s+(the\s+)?(admin\s+)?(password|api\s*key|secret|credentials?|token)\b",
            0.9
        ),
        pat!(
            "DE-002",
            DataExfiltration,
            "Bulk PII export request",
            r"(?i)(export|dump|list)\s+(all\s+)?(user\s+)?(emails?|phone\s+numbers?|records?|pii|personal\s+data)\b",
            0.85
        ),
        pat!(
            "DE-003",
            DataExfiltration,
            "System prompt extraction",
            r"(?i)(repeat|print|reveal|show)\s+(your\s+)?(system\s+prompt|initial\s+instructions?|hidden\s+prompt)\b",
            0.85
        ),
        pat!(
            "DE-004",
            DataExfiltration,
            "API key pattern request",
            r"(?i)what(?:'s|\s+is)\s+(the\s+|your\s+)?(api[\s_-]?key|secret\s+key|access\s+token)\b",
            0.8
        ),
        // ── trust (structural signals) ───────────────────────────────
        pat!(
            "TR-001",
            Trust,
            "Fake system tag",
            r"(?i)\[(system|admin)\]",
            0.7
        ),
        pat!(
            "TR-002",
            Trust,
            "Role-as-system string",
            r#"(?i)role\s*[:=]\s*"?system"?"#,
            0.7
        ),
        pat!(
            "TR-003",
            Trust,
            "Instruction-override phrase (structural)",
            r"(?i)ignore\s+(all\s+)?(previous|prior|above)\s+(instructions?|prompts?)",
            0.6
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn every_builtin_pattern_compiles() {
        for p in builtin_patterns() {
            Regex::new(&p.regex_str).unwrap_or_else(|e| panic!("pattern {} failed to compile: {e}", p.id));
        }
    }

    #[test]
    fn pattern_ids_are_unique() {
        let patterns = builtin_patterns();
        let mut ids: Vec<&str> = patterns.iter().map(|p| p.id.as_ref()).collect();
        ids.sort_unstable();
        let mut deduped = ids.clone();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len(), "duplicate pattern id found");
    }

    #[test]
    fn every_detection_type_has_at_least_one_pattern() {
        use DetectionType::{DataExfiltration, PrivilegeEscalation, PromptInjection, SocialEngineering, Trust};
        let patterns = builtin_patterns();
        for ty in [PromptInjection, SocialEngineering, PrivilegeEscalation, DataExfiltration, Trust] {
            assert!(patterns.iter().any(|p| p.detection_type == ty), "no pattern for {ty}");
        }
    }
}

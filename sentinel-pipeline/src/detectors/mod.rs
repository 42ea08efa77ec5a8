//! The six built-in detector kinds from §4.1.
//!
//! Five of the six (`prompt_injection`, `social_engineering`,
//! `privilege_escalation`, `data_exfiltration`, `trust`) are plain
//! [`crate::detector::PatternDetector`] instances over a filtered slice of
//! the built-in pattern table. `evasion` is structurally different — it
//! fires on the normalizer's own verdict rather than a regex match — so it
//! gets its own type, in [`evasion`].

pub mod evasion;

use sentinel_types::DetectionType;

use crate::detector::{Detector, PatternDetector};
use crate::error::DetectorError;

/// Builds the full, correctly-ordered set of built-in detectors.
///
/// Priorities leave headroom between detectors (steps of 10) so a future
/// detector can be inserted between any two without renumbering the rest.
pub fn builtin_detectors() -> Result<Vec<Box<dyn Detector>>, DetectorError> {
    Ok(vec![
        Box::new(PatternDetector::for_type(
            "trust",
            20,
            DetectionType::Trust,
        )?),
        Box::new(evasion::EvasionDetector::new(30)),
        Box::new(PatternDetector::for_type(
            "prompt_injection",
            40,
            DetectionType::PromptInjection,
        )?),
        Box::new(PatternDetector::for_type(
            "privilege_escalation",
            50,
            DetectionType::PrivilegeEscalation,
        )?),
        Box::new(PatternDetector::for_type(
            "data_exfiltration",
            60,
            DetectionType::DataExfiltration,
        )?),
        Box::new(PatternDetector::for_type(
            "social_engineering",
            70,
            DetectionType::SocialEngineering,
        )?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_detectors_construct_without_error() {
        let detectors = builtin_detectors().unwrap();
        assert_eq!(detectors.len(), 6);
    }

    #[test]
    fn builtin_detectors_are_priority_ordered_ascending() {
        let detectors = builtin_detectors().unwrap();
        let priorities: Vec<u32> = detectors.iter().map(|d| d.priority()).collect();
        let mut sorted = priorities.clone();
        sorted.sort_unstable();
        assert_eq!(priorities, sorted);
    }
}

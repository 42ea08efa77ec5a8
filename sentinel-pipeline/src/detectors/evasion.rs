//! The `evasion` detector kind (§4.1): fires when the normalizer itself
//! found something to fold — homoglyphs, zero-width characters, fullwidth
//! forms, dot-separation, or leetspeak — which is itself evidence of an
//! evasion attempt independent of whatever the normalized text goes on to
//! trigger in other detectors.

use async_trait::async_trait;
use sentinel_types::{DetectionType, Finding};

use crate::detector::Detector;
use crate::error::DetectorError;
use crate::input::DetectionInput;

pub struct EvasionDetector {
    priority: u32,
}

impl EvasionDetector {
    #[must_use]
    pub fn new(priority: u32) -> Self {
        Self { priority }
    }
}

#[async_trait]
impl Detector for EvasionDetector {
    fn id(&self) -> &'static str {
        "evasion"
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn detect(&self, turn: &DetectionInput<'_>) -> Result<Vec<Finding>, DetectorError> {
        if !turn.was_normalized() {
            return Ok(Vec::new());
        }
        let finding = Finding::new(DetectionType::Evasion, 0.5, vec!["normalization_changed_text".to_string()])
            .with_details(serde_json::json!({
                "raw_len": turn.raw().len(),
                "normalized_len": turn.effective().len(),
            }))
            .with_evasion_co_tag(true);
        Ok(vec![finding])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fires_when_normalization_changed_text() {
        let d = EvasionDetector::new(30);
        let input = DetectionInput::new("p\u{0430}ssword", Some("password"));
        let findings = d.detect(&input).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].finding_type, DetectionType::Evasion);
    }

    #[tokio::test]
    async fn silent_when_text_was_unchanged() {
        let d = EvasionDetector::new(30);
        let input = DetectionInput::new("hello", None);
        assert!(d.detect(&input).await.unwrap().is_empty());
    }
}

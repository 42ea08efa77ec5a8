//! Threshold configuration (§6): the four sensitivity presets and the
//! invariants a loaded configuration must satisfy.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Named sensitivity preset; `Medium` is the documented default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Low,
    Medium,
    High,
    Paranoid,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self::Medium
    }
}

/// Score thresholds that drive the §4.3 mode transitions and §4.2 level
/// buckets.
///
/// Invariants (validated on load, §6): `monitor < honeypot` and
/// `honeypot <= block`. A violated invariant is a fatal boot-time error
/// per §7 ("config violation on boot ... abort startup"), never a runtime
/// one — `ThresholdConfig` is immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ordering"))]
pub struct ThresholdConfig {
    /// Score at or above which mode becomes at least `monitoring`.
    pub monitor: f64,
    /// Score at or above which mode becomes at least `honeypot`.
    pub honeypot: f64,
    /// Score at or above which an alert is emitted (§4.2 level mapping).
    pub alert: f64,
    /// Score at or above which mode becomes `blocked`.
    pub block: f64,
}

/// Error constructing a [`ThresholdConfig`]: the ordering invariant failed.
#[derive(Debug, Error, PartialEq)]
pub enum ThresholdError {
    /// `monitor` was not strictly less than `honeypot`.
    #[error("threshold invariant violated: monitor ({monitor}) must be < honeypot ({honeypot})")]
    MonitorNotBelowHoneypot { monitor: f64, honeypot: f64 },
    /// `honeypot` was greater than `block`.
    #[error("threshold invariant violated: honeypot ({honeypot}) must be <= block ({block})")]
    HoneypotAboveBlock { honeypot: f64, block: f64 },
}

impl ThresholdConfig {
    /// Builds and validates a threshold set, per §6's two invariants.
    pub fn new(monitor: f64, honeypot: f64, alert: f64, block: f64) -> Result<Self, ThresholdError> {
        if !(monitor < honeypot) {
            return Err(ThresholdError::MonitorNotBelowHoneypot { monitor, honeypot });
        }
        if honeypot > block {
            return Err(ThresholdError::HoneypotAboveBlock { honeypot, block });
        }
        Ok(Self {
            monitor,
            honeypot,
            alert,
            block,
        })
    }

    /// The built-in preset table from §6.
    #[must_use]
    pub fn for_sensitivity(sensitivity: Sensitivity) -> Self {
        let (monitor, honeypot, alert, block) = match sensitivity {
            Sensitivity::Low => (40.0, 70.0, 70.0, 90.0),
            Sensitivity::Medium => (30.0, 60.0, 60.0, 80.0),
            Sensitivity::High => (20.0, 45.0, 45.0, 65.0),
            Sensitivity::Paranoid => (10.0, 30.0, 30.0, 50.0),
        };
        // Presets are constructed from a fixed, known-valid table, so this
        // cannot fail; debug_assert keeps that guarantee honest if the
        // table is ever edited.
        let cfg = Self {
            monitor,
            honeypot,
            alert,
            block,
        };
        debug_assert!(cfg.check_ordering().is_ok(), "built-in preset violates invariants");
        cfg
    }

    /// Re-checks the invariants, e.g. after deserializing from YAML/JSON
    /// (§9 design note: "read-only, validated, immutable record
    /// constructed at startup"). This is the typed counterpart of the
    /// [`Validate`] impl below, used where a `ThresholdError` (rather than
    /// `validator`'s generic `ValidationErrors`) is more useful to the
    /// caller.
    pub fn check_ordering(&self) -> Result<(), ThresholdError> {
        if !(self.monitor < self.honeypot) {
            return Err(ThresholdError::MonitorNotBelowHoneypot {
                monitor: self.monitor,
                honeypot: self.honeypot,
            });
        }
        if self.honeypot > self.block {
            return Err(ThresholdError::HoneypotAboveBlock {
                honeypot: self.honeypot,
                block: self.block,
            });
        }
        Ok(())
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::for_sensitivity(Sensitivity::Medium)
    }
}

/// Schema-level validation hook for `#[derive(Validate)]`'s cross-field
/// invariant support.
fn validate_ordering(cfg: &ThresholdConfig) -> Result<(), ValidationError> {
    cfg.check_ordering()
        .map_err(|_| ValidationError::new("threshold_ordering"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_presets_validate() {
        for s in [
            Sensitivity::Low,
            Sensitivity::Medium,
            Sensitivity::High,
            Sensitivity::Paranoid,
        ] {
            assert!(ThresholdConfig::for_sensitivity(s).check_ordering().is_ok());
        }
    }

    #[test]
    fn medium_matches_spec_table() {
        let cfg = ThresholdConfig::for_sensitivity(Sensitivity::Medium);
        assert_eq!(cfg.monitor, 30.0);
        assert_eq!(cfg.honeypot, 60.0);
        assert_eq!(cfg.alert, 60.0);
        assert_eq!(cfg.block, 80.0);
    }

    #[test]
    fn rejects_monitor_not_below_honeypot() {
        let err = ThresholdConfig::new(60.0, 60.0, 60.0, 80.0).unwrap_err();
        assert!(matches!(err, ThresholdError::MonitorNotBelowHoneypot { .. }));
    }

    #[test]
    fn rejects_honeypot_above_block() {
        let err = ThresholdConfig::new(10.0, 90.0, 60.0, 80.0).unwrap_err();
        assert!(matches!(err, ThresholdError::HoneypotAboveBlock { .. }));
    }

    #[test]
    fn honeypot_equal_to_block_is_allowed() {
        assert!(ThresholdConfig::new(10.0, 80.0, 60.0, 80.0).is_ok());
    }

    #[test]
    fn validator_trait_rejects_bad_ordering() {
        let bad = ThresholdConfig {
            monitor: 60.0,
            honeypot: 60.0,
            alert: 60.0,
            block: 80.0,
        };
        assert!(bad.validate().is_err());
        assert!(ThresholdConfig::default().validate().is_ok());
    }
}

//! Boot-time configuration for the ingestion service (§6, §9: "read-only,
//! validated, immutable record constructed at startup").

use sentinel_types::{Sensitivity, ThresholdConfig, ThresholdError};
use thiserror::Error;

/// A config violation discovered at boot. Per §7, this is always fatal —
/// startup aborts rather than falling back to a default.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("BOT_SECRET is not set")]
    MissingBotSecret,
    #[error("invalid SENTINEL_SENSITIVITY value {0:?}; expected low|medium|high|paranoid")]
    InvalidSensitivity(String),
    #[error(transparent)]
    ThresholdOrdering(#[from] ThresholdError),
}

/// Immutable ingestion-service configuration, read once from the
/// environment at startup.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub bot_secret: String,
    pub thresholds: ThresholdConfig,
    pub broadcast_capacity: usize,
    pub fleet_status_interval: std::time::Duration,
}

impl IngestConfig {
    /// Reads and validates configuration from the process environment.
    /// Any failure here is a fatal boot error (§7).
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = std::env::var("INGEST_BIND").unwrap_or_else(|_| "0.0.0.0:8088".to_string());
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingDatabaseUrl)?;
        let bot_secret = std::env::var("BOT_SECRET").map_err(|_| ConfigError::MissingBotSecret)?;
        if bot_secret.trim().is_empty() {
            return Err(ConfigError::MissingBotSecret);
        }

        let sensitivity = match std::env::var("SENTINEL_SENSITIVITY") {
            Ok(raw) => parse_sensitivity(&raw).ok_or(ConfigError::InvalidSensitivity(raw))?,
            Err(_) => Sensitivity::Medium,
        };
        let thresholds = ThresholdConfig::for_sensitivity(sensitivity);
        thresholds.check_ordering()?;

        let broadcast_capacity = std::env::var("BROADCAST_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1024);

        let fleet_status_interval_secs: u64 =
            std::env::var("FLEET_STATUS_INTERVAL_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(15);

        Ok(Self {
            bind_addr,
            database_url,
            bot_secret,
            thresholds,
            broadcast_capacity,
            fleet_status_interval: std::time::Duration::from_secs(fleet_status_interval_secs.max(1)),
        })
    }
}

fn parse_sensitivity(raw: &str) -> Option<Sensitivity> {
    match raw.trim().to_lowercase().as_str() {
        "low" => Some(Sensitivity::Low),
        "medium" => Some(Sensitivity::Medium),
        "high" => Some(Sensitivity::High),
        "paranoid" => Some(Sensitivity::Paranoid),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sensitivity_accepts_known_values() {
        assert_eq!(parse_sensitivity("HIGH"), Some(Sensitivity::High));
        assert_eq!(parse_sensitivity(" paranoid "), Some(Sensitivity::Paranoid));
        assert_eq!(parse_sensitivity("extreme"), None);
    }
}

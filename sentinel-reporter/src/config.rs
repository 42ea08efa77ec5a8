//! Reporter configuration (§4.7, §6): the three env vars that gate whether
//! the reporter does anything at all.

/// Reads `CENTRAL_LOGGING_URL`, `BOT_ID`, `BOT_SECRET`, `PERSONA_FILE` from
/// the environment. A reporter built from a config missing any of the
/// first three is disabled (§6: "empty/missing disables reporter").
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    pub central_url: Option<String>,
    pub bot_id: Option<String>,
    pub bot_secret: Option<String>,
    pub persona_file: Option<String>,
}

impl ReporterConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            central_url: non_empty(std::env::var("CENTRAL_LOGGING_URL").ok()),
            bot_id: non_empty(std::env::var("BOT_ID").ok()),
            bot_secret: non_empty(std::env::var("BOT_SECRET").ok()),
            persona_file: non_empty(std::env::var("PERSONA_FILE").ok()),
        }
    }

    /// `true` only when `central_url`, `bot_id`, and `bot_secret` are all
    /// present and non-empty (§4.7: "enabled only when a central URL, bot
    /// id, and shared secret are all present").
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        [&self.central_url, &self.bot_id, &self.bot_secret]
            .iter()
            .all(|v| v.as_deref().is_some_and(|s| !s.trim().is_empty()))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_when_any_required_field_missing() {
        let cfg = ReporterConfig {
            central_url: Some("https://central".into()),
            bot_id: Some("bot-1".into()),
            bot_secret: None,
            persona_file: None,
        };
        assert!(!cfg.is_enabled());
    }

    #[test]
    fn enabled_when_all_three_present() {
        let cfg = ReporterConfig {
            central_url: Some("https://central".into()),
            bot_id: Some("bot-1".into()),
            bot_secret: Some("s3cr3t".into()),
            persona_file: None,
        };
        assert!(cfg.is_enabled());
    }

    #[test]
    fn blank_string_counts_as_missing() {
        let cfg = ReporterConfig {
            central_url: Some("   ".into()),
            bot_id: Some("bot-1".into()),
            bot_secret: Some("s3cr3t".into()),
            persona_file: None,
        };
        assert!(!cfg.is_enabled());
    }
}

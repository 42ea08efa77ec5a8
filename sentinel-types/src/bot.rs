//! `Bot` (§3): the registered persona-fronted agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bot's current connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BotStatus {
    Online,
    Offline,
    Degraded,
}

/// A registered agent persona, per §3.
///
/// Unique on `bot_id`. Created by first registration; mutated by later
/// registrations and heartbeats (UPSERT semantics, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub bot_id: String,
    pub persona_category: String,
    pub persona_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub status: BotStatus,
    pub last_heartbeat: DateTime<Utc>,
    /// 64-hex prefix of SHA-256 over the serialized config, see
    /// [`sentinel_types::hashing::sha256_hex`](crate::hashing::sha256_hex).
    pub config_hash: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Bot {
    /// Computes `config_hash` for an arbitrary serializable config value.
    ///
    /// Serializes with `serde_json::to_string` so the hash is stable across
    /// calls for structurally-equal configs (field order is fixed by the
    /// struct's `Serialize` derive).
    pub fn config_hash_of<T: Serialize>(config: &T) -> Result<String, serde_json::Error> {
        let serialized = serde_json::to_string(config)?;
        Ok(crate::hashing::sha256_hex(&serialized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_hash_is_stable_for_equal_configs() {
        #[derive(Serialize)]
        struct Cfg {
            a: u32,
            b: String,
        }
        let c1 = Cfg { a: 1, b: "x".into() };
        let c2 = Cfg { a: 1, b: "x".into() };
        assert_eq!(
            Bot::config_hash_of(&c1).unwrap(),
            Bot::config_hash_of(&c2).unwrap()
        );
    }

    #[test]
    fn bot_round_trips_json() {
        let bot = Bot {
            bot_id: "bot-1".into(),
            persona_category: "support".into(),
            persona_name: "Ava".into(),
            company_name: None,
            status: BotStatus::Online,
            last_heartbeat: Utc::now(),
            config_hash: "a".repeat(64),
            metadata: serde_json::json!({}),
        };
        let json = serde_json::to_string(&bot).unwrap();
        let parsed: Bot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.bot_id, bot.bot_id);
    }
}

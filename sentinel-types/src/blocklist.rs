//! `BlocklistEntry` (§3, §4.6): a persisted block on a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One blocklist entry, keyed externally by `user_id` (or an anonymized
/// hash for shared/community entries), per §3.
///
/// Invariant: if `expires_at` is set and past, the entry is treated as
/// absent and lazily removed on first access — enforced by
/// [`BlocklistEntry::is_expired`], not by eager background expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlocklistEntry {
    pub reason: String,
    pub blocked_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub detections: Vec<String>,
    pub score: f64,
    /// `"community"` for entries merged via `import_community`, `None` for
    /// locally originated blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl BlocklistEntry {
    /// `true` once `now` has passed `expires_at`; permanent entries
    /// (`expires_at: None`) are never expired.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn permanent_entry_never_expires() {
        let entry = BlocklistEntry {
            reason: "r".into(),
            blocked_at: Utc::now(),
            expires_at: None,
            detections: vec![],
            score: 90.0,
            source: None,
        };
        assert!(!entry.is_expired(Utc::now() + Duration::days(3650)));
    }

    #[test]
    fn timed_entry_expires_after_its_deadline() {
        let now = Utc::now();
        let entry = BlocklistEntry {
            reason: "r".into(),
            blocked_at: now,
            expires_at: Some(now + Duration::hours(1)),
            detections: vec![],
            score: 90.0,
            source: None,
        };
        assert!(!entry.is_expired(now + Duration::minutes(30)));
        assert!(entry.is_expired(now + Duration::hours(2)));
    }
}

//! Blocklist (§4.6): in-memory blocklist backed by a persisted blob.
//!
//! The persistence seam is a small async trait with `save`/`load`,
//! atomic and idempotent, so a durable backend (Postgres, a file,
//! anything key-value shaped) can be swapped in without touching
//! `Blocklist` itself.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sentinel_types::BlocklistEntry;

#[derive(Debug, Clone, thiserror::Error)]
pub enum BlocklistStoreError {
    #[error("blocklist backend error: {message}")]
    Backend { message: String },
}

/// Persistence seam for the blocklist's backing blob. An implementation
/// need not be fine-grained per key — `load`/`save` exchange the whole map,
/// matching §4.6's "persisted blob" wording.
#[async_trait]
pub trait BlocklistStore: Send + Sync {
    async fn load(&self) -> Result<HashMap<String, BlocklistEntry>, BlocklistStoreError>;
    async fn save(&self, entries: &HashMap<String, BlocklistEntry>) -> Result<(), BlocklistStoreError>;
}

/// In-memory-only store, for tests and for agents that don't need
/// cross-restart persistence (§1 Non-goals: "durable cross-restart
/// queuing" is explicitly out of scope for the system generally).
#[derive(Default)]
pub struct InMemoryBlocklistStore {
    inner: parking_lot::Mutex<HashMap<String, BlocklistEntry>>,
}

#[async_trait]
impl BlocklistStore for InMemoryBlocklistStore {
    async fn load(&self) -> Result<HashMap<String, BlocklistEntry>, BlocklistStoreError> {
        Ok(self.inner.lock().clone())
    }

    async fn save(&self, entries: &HashMap<String, BlocklistEntry>) -> Result<(), BlocklistStoreError> {
        *self.inner.lock() = entries.clone();
        Ok(())
    }
}

/// A block duration as given to [`Blocklist::add`] (§4.6: "if
/// `block_duration` parses as integer hours ... if `\"permanent\"`").
#[derive(Debug, Clone, Copy)]
pub enum BlockDuration {
    Hours(i64),
    Permanent,
}

impl BlockDuration {
    /// Parses `"permanent"` (case-insensitive) or an integer hour count.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("permanent") {
            return Some(Self::Permanent);
        }
        raw.trim().parse::<i64>().ok().map(Self::Hours)
    }
}

/// A stable, non-cryptographic hash suitable as a community-sharing
/// correlation key (§4.6: "a stable non-cryptographic hash is acceptable
/// for the sharing hash; this is a correlation key, not a secret").
#[must_use]
pub fn anonymize_user_id(user_id: &str) -> String {
    use std::hash::{Hash, Hasher};
    let mut hasher = rustc_hash::FxHasher::default();
    user_id.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// The blocklist itself: an in-memory map with a pluggable persisted
/// backing store.
pub struct Blocklist {
    store: Box<dyn BlocklistStore>,
    entries: parking_lot::Mutex<HashMap<String, BlocklistEntry>>,
}

impl Blocklist {
    /// Loads the initial map from `store`.
    pub async fn load(store: Box<dyn BlocklistStore>) -> Result<Self, BlocklistStoreError> {
        let entries = store.load().await?;
        Ok(Self {
            store,
            entries: parking_lot::Mutex::new(entries),
        })
    }

    async fn persist(&self) -> Result<(), BlocklistStoreError> {
        let snapshot = self.entries.lock().clone();
        self.store.save(&snapshot).await
    }

    /// Lazily expires `user_id`'s entry if past its deadline, then reports
    /// whether the user is currently blocked.
    pub fn is_blocked(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(user_id) {
            if entry.is_expired(now) {
                entries.remove(user_id);
                return false;
            }
            return true;
        }
        false
    }

    /// Adds or replaces a block on `user_id`.
    pub async fn add(
        &self,
        user_id: &str,
        reason: String,
        duration: BlockDuration,
        detections: Vec<String>,
        score: f64,
        now: DateTime<Utc>,
    ) -> Result<(), BlocklistStoreError> {
        let expires_at = match duration {
            BlockDuration::Permanent => None,
            BlockDuration::Hours(hours) => Some(now + Duration::hours(hours)),
        };
        let entry = BlocklistEntry {
            reason,
            blocked_at: now,
            expires_at,
            detections,
            score,
            source: None,
        };
        self.entries.lock().insert(user_id.to_string(), entry);
        self.persist().await
    }

    /// Removes any block on `user_id`.
    pub async fn remove(&self, user_id: &str) -> Result<(), BlocklistStoreError> {
        self.entries.lock().remove(user_id);
        self.persist().await
    }

    /// Sweeps every expired entry from the map.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<usize, BlocklistStoreError> {
        let removed = {
            let mut entries = self.entries.lock();
            let before = entries.len();
            entries.retain(|_, entry| !entry.is_expired(now));
            before - entries.len()
        };
        if removed > 0 {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Merges externally-sourced entries, tagging each with
    /// `source: "community"` (§4.6).
    pub async fn import_community(
        &self,
        incoming: HashMap<String, BlocklistEntry>,
    ) -> Result<usize, BlocklistStoreError> {
        let count = incoming.len();
        {
            let mut entries = self.entries.lock();
            for (key, mut entry) in incoming {
                entry.source = Some("community".to_string());
                entries.insert(key, entry);
            }
        }
        self.persist().await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_with_hour_duration_sets_expiry() {
        let blocklist = Blocklist::load(Box::new(InMemoryBlocklistStore::default())).await.unwrap();
        let now = Utc::now();
        blocklist
            .add("u1", "bad".into(), BlockDuration::Hours(1), vec![], 90.0, now)
            .await
            .unwrap();
        assert!(blocklist.is_blocked("u1", now));
        assert!(!blocklist.is_blocked("u1", now + Duration::hours(2)));
    }

    #[tokio::test]
    async fn permanent_block_never_expires() {
        let blocklist = Blocklist::load(Box::new(InMemoryBlocklistStore::default())).await.unwrap();
        let now = Utc::now();
        blocklist
            .add("u1", "bad".into(), BlockDuration::Permanent, vec![], 90.0, now)
            .await
            .unwrap();
        assert!(blocklist.is_blocked("u1", now + Duration::days(365)));
    }

    #[tokio::test]
    async fn remove_unblocks() {
        let blocklist = Blocklist::load(Box::new(InMemoryBlocklistStore::default())).await.unwrap();
        let now = Utc::now();
        blocklist
            .add("u1", "bad".into(), BlockDuration::Permanent, vec![], 90.0, now)
            .await
            .unwrap();
        blocklist.remove("u1").await.unwrap();
        assert!(!blocklist.is_blocked("u1", now));
    }

    #[tokio::test]
    async fn cleanup_sweeps_expired_entries() {
        let blocklist = Blocklist::load(Box::new(InMemoryBlocklistStore::default())).await.unwrap();
        let now = Utc::now();
        blocklist
            .add("u1", "bad".into(), BlockDuration::Hours(1), vec![], 90.0, now)
            .await
            .unwrap();
        let removed = blocklist.cleanup(now + Duration::hours(2)).await.unwrap();
        assert_eq!(removed, 1);
    }

    #[tokio::test]
    async fn import_community_tags_source() {
        let blocklist = Blocklist::load(Box::new(InMemoryBlocklistStore::default())).await.unwrap();
        let mut incoming = HashMap::new();
        incoming.insert(
            anonymize_user_id("shared-user"),
            BlocklistEntry {
                reason: "shared".into(),
                blocked_at: Utc::now(),
                expires_at: None,
                detections: vec![],
                score: 80.0,
                source: None,
            },
        );
        blocklist.import_community(incoming).await.unwrap();
        assert!(blocklist.is_blocked(&anonymize_user_id("shared-user"), Utc::now()));
    }

    #[test]
    fn block_duration_parses_permanent_and_hours() {
        assert!(matches!(BlockDuration::parse("permanent"), Some(BlockDuration::Permanent)));
        assert!(matches!(BlockDuration::parse("24"), Some(BlockDuration::Hours(24))));
        assert!(BlockDuration::parse("forever").is_none());
    }
}

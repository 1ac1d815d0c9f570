//! Persisted update-check cache.
//!
//! The engine remembers the result of its last manifest fetch so repeated
//! checks inside the configured interval cost nothing on the network. The
//! record lives in the host's [`KeyValueStore`] as a small JSON document:
//!
//! ```json
//! { "lastChecked": 1704067200000, "versions": [ { "version": "1.2.0", ... } ] }
//! ```
//!
//! The cache is an optimization, not a correctness requirement: loading never
//! fails (absent or unreadable records become the default), and saving
//! reports failure as a boolean the caller may warn about or ignore.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::host::{KeyValueStore, ScriptIdentity};

/// One published release, exactly as the manifest describes it.
///
/// Immutable once stored; a cache refresh replaces the whole list rather
/// than merging. `version` is expected to match the dotted-numeric grammar
/// (see [`crate::version`]); the checker validates it when filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionData {
    /// Dotted-numeric version string, e.g. `"1.2.0"`.
    pub version: String,
    /// Publication date as the manifest states it.
    pub date: String,
    /// Human-readable release notes.
    pub notes: String,
    /// Download URL of the release archive.
    pub url: String,
}

/// The persisted cache record: when we last asked, and what we were told.
///
/// `last_checked` is epoch milliseconds and is monotonically non-decreasing
/// across successful refreshes; `versions` preserves manifest order. The
/// default value (`last_checked = 0`, no versions) is what a first-ever
/// check starts from, and `0` is stale against any real cutoff, so the first
/// check always fetches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheRecord {
    /// Epoch milliseconds of the last successful manifest refresh.
    pub last_checked: i64,
    /// Versions from the most recent successful fetch, in manifest order.
    pub versions: Vec<VersionData>,
}

/// Load/save access to the persisted cache record.
///
/// Generic over the host's [`KeyValueStore`]; the key is namespaced by
/// script identity so several managed scripts can share one store.
///
/// # Examples
///
/// ```rust,no_run
/// use evergreen::host::{native::JsonFileStore, ScriptIdentity};
/// use evergreen::update::UpdateCache;
///
/// # async fn example() {
/// let identity = ScriptIdentity::new("night-watch", "/opt/scripts/night-watch");
/// let cache = UpdateCache::new(JsonFileStore::new("/var/lib/night-watch"), &identity);
///
/// let record = cache.load().await;
/// if !cache.save(&record).await {
///     // Lost the cache, not the update check; carry on.
/// }
/// # }
/// ```
pub struct UpdateCache<S> {
    store: S,
    key: String,
}

impl<S: KeyValueStore> UpdateCache<S> {
    /// Create a cache keyed by the script's identity
    /// (`"<script name>.update-check"`).
    pub fn new(store: S, identity: &ScriptIdentity) -> Self {
        Self::for_key(store, format!("{}.update-check", identity.name))
    }

    /// Create a cache under an explicit store key, for hosts with their own
    /// namespace scheme.
    pub fn for_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// The store key this cache reads and writes.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Load the persisted record, or the default when none exists.
    ///
    /// Never fails: an absent key yields `CacheRecord::default()`, and an
    /// unreadable record is discarded with a warning and treated the same
    /// way.
    pub async fn load(&self) -> CacheRecord {
        let Some(raw) = self.store.get(&self.key).await else {
            debug!("no cached update record under '{}'", self.key);
            return CacheRecord::default();
        };
        match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(err) => {
                warn!("discarding unreadable update cache under '{}': {err}", self.key);
                CacheRecord::default()
            }
        }
    }

    /// Persist the record, best-effort.
    ///
    /// Returns `false` when serialization or the store write fails; the
    /// failure is also logged at warn level. Callers proceed either way.
    pub async fn save(&self, record: &CacheRecord) -> bool {
        let raw = match serde_json::to_string(record) {
            Ok(raw) => raw,
            Err(err) => {
                warn!("could not serialize update cache: {err}");
                return false;
            }
        };
        let stored = self.store.set(&self.key, &raw).await;
        if !stored {
            warn!("store refused update cache write under '{}'", self.key);
        }
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serializes_with_wire_field_names() {
        let record = CacheRecord {
            last_checked: 1_704_067_200_000,
            versions: vec![VersionData {
                version: "1.2.0".to_string(),
                date: "2024-01-01".to_string(),
                notes: "initial".to_string(),
                url: "https://example.com/1.2.0.zip".to_string(),
            }],
        };

        let raw = serde_json::to_string(&record).unwrap();
        assert!(raw.contains("\"lastChecked\":1704067200000"));
        assert!(raw.contains("\"versions\""));

        let back: CacheRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn default_record_is_the_first_check_state() {
        let record = CacheRecord::default();
        assert_eq!(record.last_checked, 0);
        assert!(record.versions.is_empty());
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let back: CacheRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(back, CacheRecord::default());
    }
}

//! Local rating store
//!
//! Key-value persistence for this user's own ratings. Reads and writes go to
//! an in-memory overlay first and then to durable storage when available.
//! Durable failures (missing file, read-only folder, corrupt contents) are
//! logged and swallowed so read-after-write keeps working for the session.

use mtgr_common::{CardIdentity, RatingValue};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Composite key for a locally cached rating
///
/// Embeds collection, format, set and card so keys never collide across
/// collections or formats.
pub fn local_rating_key(collection_id: &str, format_id: &str, identity: &CardIdentity) -> String {
    format!(
        "cardKey_collectionId-{}_formatId-{}_setCode-{}_cardCode-{}_localRating",
        collection_id, format_id, identity.set_code, identity.card_code
    )
}

/// Durable key-value backend
///
/// Errors are reported to [`LocalRatingStore`], which swallows them.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// JSON file holding every key, rewritten on each change
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or create on first write) the storage file at `path`
    ///
    /// Fails when the file exists but is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&content).map_err(|e| {
                    Error::Storage(format!("{} is not a rating cache: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "Opened rating cache file");

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.clear();
        self.persist(&entries)
    }
}

/// Rating cache with an in-memory overlay over optional durable storage
pub struct LocalRatingStore {
    overlay: Mutex<HashMap<String, String>>,
    durable: Option<Box<dyn DurableStorage>>,
}

impl LocalRatingStore {
    pub fn new(durable: Box<dyn DurableStorage>) -> Self {
        Self {
            overlay: Mutex::new(HashMap::new()),
            durable: Some(durable),
        }
    }

    /// Session-only store
    pub fn in_memory() -> Self {
        Self {
            overlay: Mutex::new(HashMap::new()),
            durable: None,
        }
    }

    /// File-backed store, degrading to memory-only if the file can't be opened
    pub fn open_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match FileStorage::open(&path) {
            Ok(storage) => Self::new(Box::new(storage)),
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Rating cache unavailable, ratings will only last this session"
                );
                Self::in_memory()
            }
        }
    }

    pub fn is_durable(&self) -> bool {
        self.durable.is_some()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = lock(&self.overlay).get(key) {
            return Some(value.clone());
        }
        let durable = self.durable.as_ref()?;
        match durable.get(key) {
            Ok(value) => value,
            Err(e) => {
                debug!(key, error = %e, "Durable read failed");
                None
            }
        }
    }

    pub fn set(&self, key: &str, value: &str) {
        lock(&self.overlay).insert(key.to_string(), value.to_string());
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.set(key, value) {
                debug!(key, error = %e, "Durable write failed, kept in memory");
            }
        }
    }

    pub fn remove(&self, key: &str) {
        lock(&self.overlay).remove(key);
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.remove(key) {
                debug!(key, error = %e, "Durable remove failed");
            }
        }
    }

    pub fn clear(&self) {
        lock(&self.overlay).clear();
        if let Some(durable) = &self.durable {
            if let Err(e) = durable.clear() {
                debug!(error = %e, "Durable clear failed");
            }
        }
    }

    /// Cached rating for a (collection, format, card), ignoring unparseable values
    pub fn local_rating(
        &self,
        collection_id: &str,
        format_id: &str,
        identity: &CardIdentity,
    ) -> Option<RatingValue> {
        let key = local_rating_key(collection_id, format_id, identity);
        let raw = self.get(&key)?;
        match raw.parse::<RatingValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(key = %key, value = %raw, "Ignoring invalid cached rating");
                None
            }
        }
    }

    pub fn set_local_rating(
        &self,
        collection_id: &str,
        format_id: &str,
        identity: &CardIdentity,
        value: RatingValue,
    ) {
        self.set(&local_rating_key(collection_id, format_id, identity), value.as_str());
    }

    pub fn remove_local_rating(&self, collection_id: &str, format_id: &str, identity: &CardIdentity) {
        self.remove(&local_rating_key(collection_id, format_id, identity));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Durable storage that fails every call
    struct BrokenStorage;

    impl DurableStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(Error::Storage("quota exceeded".to_string()))
        }
        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".to_string()))
        }
        fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::Storage("quota exceeded".to_string()))
        }
        fn clear(&self) -> Result<()> {
            Err(Error::Storage("quota exceeded".to_string()))
        }
    }

    #[test]
    fn test_key_format() {
        let key = local_rating_key("otj", "limited", &CardIdentity::new("otp", "12"));
        assert_eq!(
            key,
            "cardKey_collectionId-otj_formatId-limited_setCode-otp_cardCode-12_localRating"
        );
    }

    #[test]
    fn test_keys_differ_across_collections_and_formats() {
        let card = CardIdentity::new("otj", "1");
        let a = local_rating_key("otj", "limited", &card);
        let b = local_rating_key("draft_otj", "limited", &card);
        let c = local_rating_key("otj", "cube", &card);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_broken_storage_still_reads_after_write() {
        let store = LocalRatingStore::new(Box::new(BrokenStorage));
        assert_eq!(store.get("k"), None);

        store.set("k", "3");
        assert_eq!(store.get("k"), Some("3".to_string()));

        store.remove("k");
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ratings.json");
        let card = CardIdentity::new("otj", "5");

        {
            let store = LocalRatingStore::open_file(&path);
            assert!(store.is_durable());
            store.set_local_rating("otj", "limited", &card, RatingValue::Two);
        }

        let reopened = LocalRatingStore::open_file(&path);
        assert_eq!(
            reopened.local_rating("otj", "limited", &card),
            Some(RatingValue::Two)
        );
        assert_eq!(reopened.local_rating("otj", "cube", &card), None);
    }

    #[test]
    fn test_corrupt_file_degrades_to_memory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ratings.json");
        std::fs::write(&path, "[not, a, map").unwrap();

        let store = LocalRatingStore::open_file(&path);
        assert!(!store.is_durable());

        store.set("k", "1");
        assert_eq!(store.get("k"), Some("1".to_string()));
    }

    #[test]
    fn test_clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ratings.json");
        let store = LocalRatingStore::open_file(&path);
        store.set("a", "1");
        store.set("b", "2");

        store.clear();
        assert_eq!(store.get("a"), None);

        let reopened = LocalRatingStore::open_file(&path);
        assert_eq!(reopened.get("b"), None);
    }

    #[test]
    fn test_invalid_cached_value_is_ignored() {
        let store = LocalRatingStore::in_memory();
        let card = CardIdentity::new("otj", "1");
        store.set(&local_rating_key("otj", "limited", &card), "7");
        assert_eq!(store.local_rating("otj", "limited", &card), None);
    }
}

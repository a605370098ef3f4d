//! Persistent fingerprint → validated-address cache with expiry.
//!
//! The cache is the one piece of state that outlives an import run: a JSON
//! file mapping content-derived fingerprints to validated addresses, each
//! entry carrying a fixed time-to-live. Expired entries are ignored on read
//! and dropped on save. A second lookup for the same key inside the TTL
//! window never triggers another remote validation.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::address::AddressRecord;
use crate::error::ImportError;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    record: AddressRecord,
    cached_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Disk-backed address cache.
pub struct AddressCache {
    path: PathBuf,
    ttl_days: i64,
    entries: HashMap<String, CacheEntry>,
}

impl AddressCache {
    /// Opens the cache at `path`, loading any existing entries. A missing
    /// file starts empty; a malformed file is discarded with a warning
    /// rather than failing the import.
    #[must_use]
    pub fn open(path: &Path, ttl_days: i64) -> Self {
        let entries = match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "discarding malformed address cache");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };

        Self {
            path: path.to_path_buf(),
            ttl_days,
            entries,
        }
    }

    /// Returns the cached record for `key` if present and unexpired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&AddressRecord> {
        self.entries
            .get(key)
            .filter(|entry| entry.expires_at > Utc::now())
            .map(|entry| &entry.record)
    }

    /// Stores `record` under `key` with the configured TTL.
    pub fn insert(&mut self, key: String, record: AddressRecord) {
        let now = Utc::now();
        self.entries.insert(
            key,
            CacheEntry {
                record,
                cached_at: now,
                expires_at: now + Duration::days(self.ttl_days),
            },
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the cache back to disk, dropping expired entries.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Cache`] if the file or its parent directory
    /// cannot be written.
    pub fn save(&mut self) -> Result<(), ImportError> {
        let now = Utc::now();
        self.entries.retain(|_, entry| entry.expires_at > now);

        let cache_error = |reason: String| ImportError::Cache {
            path: self.path.display().to_string(),
            reason,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| cache_error(e.to_string()))?;
            }
        }

        let serialized =
            serde_json::to_string_pretty(&self.entries).map_err(|e| cache_error(e.to_string()))?;
        fs::write(&self.path, serialized).map_err(|e| cache_error(e.to_string()))?;
        Ok(())
    }

    /// Deletes the cache file entirely (the `flush-cache` operation).
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Cache`] if the file exists but cannot be removed.
    pub fn flush(path: &Path) -> Result<(), ImportError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ImportError::Cache {
                path: path.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line1: &str) -> AddressRecord {
        AddressRecord {
            line1: line1.into(),
            line2: String::new(),
            city: "Springfield".into(),
            state: "IL".into(),
            county: Some("Sangamon".into()),
            zip: "62701".into(),
            country: "US".into(),
            latitude: String::new(),
            longitude: String::new(),
        }
    }

    #[test]
    fn round_trips_entries_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address_cache.json");

        let mut cache = AddressCache::open(&path, 90);
        cache.insert("key-1".into(), record("100 Main St"));
        cache.save().unwrap();

        let reopened = AddressCache::open(&path, 90);
        assert_eq!(reopened.get("key-1").unwrap().line1, "100 Main St");
        assert!(reopened.get("key-2").is_none());
    }

    #[test]
    fn expired_entries_are_invisible_and_dropped_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address_cache.json");

        // Negative TTL expires entries immediately.
        let mut cache = AddressCache::open(&path, -1);
        cache.insert("stale".into(), record("1 Old Rd"));
        assert!(cache.get("stale").is_none());

        cache.save().unwrap();
        let reopened = AddressCache::open(&path, 90);
        assert!(reopened.is_empty());
    }

    #[test]
    fn malformed_cache_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address_cache.json");
        fs::write(&path, "not json").unwrap();

        let cache = AddressCache::open(&path, 90);
        assert!(cache.is_empty());
    }

    #[test]
    fn flush_removes_the_file_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("address_cache.json");

        let mut cache = AddressCache::open(&path, 90);
        cache.insert("key".into(), record("100 Main St"));
        cache.save().unwrap();
        assert!(path.exists());

        AddressCache::flush(&path).unwrap();
        assert!(!path.exists());
        AddressCache::flush(&path).unwrap();
    }

    #[test]
    fn save_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/dir/address_cache.json");

        let mut cache = AddressCache::open(&path, 90);
        cache.insert("key".into(), record("100 Main St"));
        cache.save().unwrap();
        assert!(path.exists());
    }
}

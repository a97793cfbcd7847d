//! Disk Tier Module
//!
//! Persistent bounded store backed by a directory of serialized entry files
//! plus a compact in-memory index, so eviction and expiry decisions never
//! read payloads. The index is persisted as one consolidated `index.json`
//! rewritten after every mutation; it is the single source of truth for size
//! accounting. Entry filenames are a reversible encoding of the key, which
//! lets a lost index be rebuilt from the files themselves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::entry::CacheEntry;
use crate::cache::eviction::{relief_target, select_victims, EvictionCandidate, EvictionPolicy};
use crate::error::{CacheError, Result};

/// Name of the consolidated index file inside the tier's root directory.
pub const INDEX_FILE_NAME: &str = "index.json";

/// Extension of per-entry payload files.
const ENTRY_FILE_EXT: &str = "cache";

// == Disk Index Record ==
/// Lightweight shadow of an on-disk entry: everything eviction and expiry
/// checks need, without the payload. Exactly one record exists per entry file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DiskIndexRecord {
    pub key: String,
    pub filename: String,
    pub size: u64,
    pub created_at: u64,
    pub expires_at: Option<u64>,
    pub access_count: u64,
    pub last_accessed_at: u64,
}

impl DiskIndexRecord {
    fn from_entry(entry: &CacheEntry, filename: String) -> Self {
        Self {
            key: entry.key.clone(),
            filename,
            size: entry.size,
            created_at: entry.created_at,
            expires_at: entry.expires_at,
            access_count: entry.access_count,
            last_accessed_at: entry.last_accessed_at,
        }
    }

    fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => crate::cache::entry::current_timestamp_ms() >= expires,
            None => false,
        }
    }
}

// == Filename Encoding ==
/// Maps a key to its entry filename. The encoding is reversible, so no
/// separate key-to-filename table has to survive a crash.
pub fn filename_for_key(key: &str) -> String {
    format!("{}.{}", URL_SAFE_NO_PAD.encode(key), ENTRY_FILE_EXT)
}

/// Recovers the key from an entry filename, or None if the name was not
/// produced by `filename_for_key`.
pub fn key_for_filename(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(&format!(".{}", ENTRY_FILE_EXT))?;
    let bytes = URL_SAFE_NO_PAD.decode(stem).ok()?;
    String::from_utf8(bytes).ok()
}

// == Disk Tier ==
/// Bounded persistent store. The engine serializes all access behind a single
/// lock; file I/O inside one operation only blocks callers of this tier.
#[derive(Debug)]
pub struct DiskTier {
    /// Root directory holding entry files and the index
    root: PathBuf,
    /// In-memory index, mirrored to `index.json` after every mutation
    index: HashMap<String, DiskIndexRecord>,
    /// Sum of indexed entry sizes
    current_size: u64,
    /// Configured ceiling in bytes
    max_size: u64,
    /// Policy applied when a mutation leaves the tier over capacity
    policy: EvictionPolicy,
}

impl DiskTier {
    // == Open ==
    /// Opens (creating if needed) a disk tier rooted at `root`.
    ///
    /// Loads the persisted index; a missing index starts empty, and an index
    /// that fails to parse is rebuilt from the entry files rather than left
    /// partially consistent. Entry files that cannot be read or parsed during
    /// a rebuild are deleted.
    pub async fn open(root: impl AsRef<Path>, max_size: u64, policy: EvictionPolicy) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;

        let mut tier = Self {
            root,
            index: HashMap::new(),
            current_size: 0,
            max_size,
            policy,
        };
        tier.load_index().await?;
        Ok(tier)
    }

    // == Get ==
    /// Retrieves an entry by key. The index answers misses and expiry checks
    /// without touching the filesystem; only a confirmed hit reads the file.
    ///
    /// A file that cannot be read or parsed is treated as corruption: the
    /// entry and its index record are deleted and the lookup misses, so a bad
    /// entry disappears instead of poisoning future lookups.
    pub async fn get(&mut self, key: &str) -> Option<CacheEntry> {
        let record = self.index.get(key)?.clone();

        if record.is_expired() {
            debug!(key, "disk tier dropping expired entry on get");
            self.remove_stored_entry(&record).await;
            self.persist_index_logged().await;
            return None;
        }

        let path = self.root.join(&record.filename);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(key, error = %err, "disk tier entry file unreadable, purging record");
                self.remove_stored_entry(&record).await;
                self.persist_index_logged().await;
                return None;
            }
        };

        let mut entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key, error = %err, "disk tier entry file corrupt, purging record");
                self.remove_stored_entry(&record).await;
                self.persist_index_logged().await;
                return None;
            }
        };

        // Access statistics live in the index; the payload file is not
        // rewritten on read.
        entry.access_count = record.access_count;
        entry.last_accessed_at = record.last_accessed_at;
        entry.touch();
        if let Some(live) = self.index.get_mut(key) {
            live.access_count = entry.access_count;
            live.last_accessed_at = entry.last_accessed_at;
        }
        self.persist_index_logged().await;

        Some(entry)
    }

    // == Set ==
    /// Serializes the entry to its file, then updates and persists the index.
    /// A crash between the two writes can leave an orphan file, which simply
    /// never becomes reachable.
    ///
    /// # Returns
    /// The number of entries evicted to restore capacity.
    pub async fn set(&mut self, entry: &CacheEntry) -> Result<usize> {
        let filename = filename_for_key(&entry.key);
        let bytes = serde_json::to_vec(entry)
            .map_err(|err| CacheError::Internal(format!("entry serialization failed: {}", err)))?;
        fs::write(self.root.join(&filename), &bytes).await?;

        if let Some(old) = self
            .index
            .insert(entry.key.clone(), DiskIndexRecord::from_entry(entry, filename))
        {
            self.current_size -= old.size;
        }
        self.current_size += entry.size;

        let evicted = self.enforce_capacity().await;
        self.persist_index().await?;
        Ok(evicted)
    }

    // == Delete ==
    /// Removes the entry file and its index record. Deleting an absent key,
    /// or a record whose file is already missing, still succeeds.
    ///
    /// # Returns
    /// `true` if an index record was removed.
    pub async fn delete(&mut self, key: &str) -> Result<bool> {
        let removed = match self.index.remove(key) {
            Some(record) => {
                self.current_size -= record.size;
                match fs::remove_file(self.root.join(&record.filename)).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(err) => {
                        warn!(key, error = %err, "disk tier failed to remove entry file")
                    }
                }
                true
            }
            None => false,
        };
        self.persist_index().await?;
        Ok(removed)
    }

    // == Exists ==
    /// Reports whether a live (non-expired) record is indexed. Never touches
    /// the filesystem.
    pub fn exists(&self, key: &str) -> bool {
        self.index
            .get(key)
            .map(|record| !record.is_expired())
            .unwrap_or(false)
    }

    // == Clear All ==
    /// Removes every entry file and resets the index.
    pub async fn clear_all(&mut self) -> Result<()> {
        let records: Vec<DiskIndexRecord> = self.index.values().cloned().collect();
        for record in records {
            match fs::remove_file(self.root.join(&record.filename)).await {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(
                    key = %record.key,
                    error = %err,
                    "disk tier failed to remove entry file during clear"
                ),
            }
        }
        self.index.clear();
        self.current_size = 0;
        self.persist_index().await
    }

    // == Clear Expired ==
    /// Removes all expired entries and their files.
    ///
    /// # Returns
    /// The number of entries removed.
    pub async fn clear_expired(&mut self) -> usize {
        let expired: Vec<DiskIndexRecord> = self
            .index
            .values()
            .filter(|record| record.is_expired())
            .cloned()
            .collect();

        let count = expired.len();
        for record in expired {
            self.remove_stored_entry(&record).await;
        }
        if count > 0 {
            self.persist_index_logged().await;
        }
        count
    }

    // == Keys For Eviction ==
    /// Previews which keys the given policy would remove to free the standard
    /// relief target, without mutating the tier.
    pub fn keys_for_eviction(&self, policy: EvictionPolicy) -> Vec<String> {
        let candidates = self.candidates();
        let target = relief_target(self.current_size, self.max_size);
        select_victims(&candidates, policy, target)
    }

    // == Update Max Size ==
    /// Replaces the ceiling, evicting immediately if current usage exceeds it.
    ///
    /// # Returns
    /// The number of entries evicted.
    pub async fn update_max_size(&mut self, max_size: u64) -> Result<usize> {
        self.max_size = max_size;
        let evicted = self.enforce_capacity().await;
        self.persist_index().await?;
        Ok(evicted)
    }

    /// Replaces the eviction policy used by capacity enforcement.
    pub fn set_policy(&mut self, policy: EvictionPolicy) {
        self.policy = policy;
    }

    // == Validate Directory ==
    /// Reports whether the tier's root directory exists and is a directory.
    pub async fn validate_directory(&self) -> bool {
        fs::metadata(&self.root)
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    // == Enforce Capacity ==
    /// Evicts entries until the tier fits its ceiling.
    ///
    /// # Returns
    /// The number of entries evicted.
    pub async fn enforce_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.current_size > self.max_size && !self.index.is_empty() {
            let candidates = self.candidates();
            let target = relief_target(self.current_size, self.max_size);
            let victims = select_victims(&candidates, self.policy, target);
            if victims.is_empty() {
                break;
            }
            for key in victims {
                if let Some(record) = self.index.get(&key).cloned() {
                    self.remove_stored_entry(&record).await;
                    evicted += 1;
                }
            }
        }
        if evicted > 0 {
            debug!(
                evicted,
                current_size = self.current_size,
                max_size = self.max_size,
                "disk tier eviction pass complete"
            );
        }
        evicted
    }

    // == Accessors ==
    /// Returns the sum of indexed entry sizes.
    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    /// Returns the configured ceiling in bytes.
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Returns the current number of indexed entries.
    pub fn entry_count(&self) -> usize {
        self.index.len()
    }

    // == Internals ==
    fn candidates(&self) -> Vec<EvictionCandidate> {
        self.index
            .values()
            .map(|record| EvictionCandidate {
                key: record.key.clone(),
                size: record.size,
                created_at: record.created_at,
                last_accessed_at: record.last_accessed_at,
                access_count: record.access_count,
            })
            .collect()
    }

    /// Removes one entry's file and index record, adjusting size accounting.
    async fn remove_stored_entry(&mut self, record: &DiskIndexRecord) {
        if self.index.remove(&record.key).is_some() {
            self.current_size -= record.size;
        }
        match fs::remove_file(self.root.join(&record.filename)).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                warn!(key = %record.key, error = %err, "disk tier failed to remove entry file")
            }
        }
    }

    fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE_NAME)
    }

    /// Loads the persisted index, rebuilding from entry files when it is
    /// missing or unparseable.
    async fn load_index(&mut self) -> Result<()> {
        match fs::read(self.index_path()).await {
            Ok(bytes) => match serde_json::from_slice::<HashMap<String, DiskIndexRecord>>(&bytes) {
                Ok(index) => {
                    self.current_size = index.values().map(|record| record.size).sum();
                    self.index = index;
                    debug!(
                        entries = self.index.len(),
                        size = self.current_size,
                        "disk tier index loaded"
                    );
                    Ok(())
                }
                Err(err) => {
                    warn!(error = %err, "disk tier index corrupt, rebuilding from entry files");
                    self.rebuild_index().await
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                self.rebuild_index().await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Reconstructs the index by reading every entry file in the root
    /// directory. Files that cannot be read or parsed are deleted.
    async fn rebuild_index(&mut self) -> Result<()> {
        self.index.clear();
        self.current_size = 0;

        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(dir_entry) = dir.next_entry().await? {
            let filename = dir_entry.file_name().to_string_lossy().into_owned();
            if key_for_filename(&filename).is_none() {
                continue;
            }

            let parsed = match fs::read(dir_entry.path()).await {
                Ok(bytes) => serde_json::from_slice::<CacheEntry>(&bytes).ok(),
                Err(_) => None,
            };
            match parsed {
                Some(entry) => {
                    self.current_size += entry.size;
                    self.index.insert(
                        entry.key.clone(),
                        DiskIndexRecord::from_entry(&entry, filename),
                    );
                }
                None => {
                    warn!(filename = %filename, "discarding unreadable entry file during index rebuild");
                    let _ = fs::remove_file(dir_entry.path()).await;
                }
            }
        }

        info!(
            entries = self.index.len(),
            size = self.current_size,
            "disk tier index rebuilt"
        );
        self.persist_index().await
    }

    /// Rewrites the consolidated index file. This is the tier's durability
    /// boundary.
    async fn persist_index(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.index)
            .map_err(|err| CacheError::Internal(format!("index serialization failed: {}", err)))?;
        fs::write(self.index_path(), bytes).await?;
        Ok(())
    }

    /// Persist variant for read paths, where an index write failure must not
    /// fail the lookup. The failure is logged and the in-memory index stays
    /// authoritative until the next successful mutation.
    async fn persist_index_logged(&self) {
        if let Err(err) = self.persist_index().await {
            warn!(error = %err, "disk tier failed to persist index");
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(key: &str, payload_len: usize, ttl: Option<u64>) -> CacheEntry {
        CacheEntry::new(key.to_string(), vec![7u8; payload_len], ttl)
    }

    async fn open_tier(tmp: &TempDir) -> DiskTier {
        DiskTier::open(tmp.path(), 1024 * 1024, EvictionPolicy::Lru)
            .await
            .unwrap()
    }

    #[test]
    fn test_filename_roundtrip() {
        for key in ["simple", "with/slash", "with space", "ünïcode", ""] {
            let filename = filename_for_key(key);
            assert_eq!(key_for_filename(&filename).as_deref(), Some(key));
        }
    }

    #[test]
    fn test_key_for_filename_rejects_foreign_files() {
        assert!(key_for_filename(INDEX_FILE_NAME).is_none());
        assert!(key_for_filename("not-base64!!.cache").is_none());
    }

    #[tokio::test]
    async fn test_set_and_get_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 32, None)).await.unwrap();
        let found = tier.get("key1").await.unwrap();

        assert_eq!(found.payload, vec![7u8; 32]);
        assert_eq!(tier.entry_count(), 1);
    }

    #[tokio::test]
    async fn test_get_nonexistent_is_index_only_miss() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        assert!(tier.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn test_get_refreshes_access_stats_in_index() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        tier.get("key1").await.unwrap();
        let second = tier.get("key1").await.unwrap();

        assert_eq!(second.access_count, 3);
    }

    #[tokio::test]
    async fn test_expired_entry_purged_on_get() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, Some(1))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        assert!(tier.get("key1").await.is_none());
        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.current_size(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_file_and_record() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        let path = tmp.path().join(filename_for_key("key1"));
        assert!(path.exists());

        assert!(tier.delete("key1").await.unwrap());
        assert!(!path.exists());
        assert_eq!(tier.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        assert!(tier.delete("key1").await.unwrap());
        assert!(!tier.delete("key1").await.unwrap());
        assert!(!tier.delete("never_existed").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_succeeds_when_file_already_missing() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        std::fs::remove_file(tmp.path().join(filename_for_key("key1"))).unwrap();

        assert!(tier.delete("key1").await.unwrap());
    }

    #[tokio::test]
    async fn test_exists_consults_index_only() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        assert!(tier.exists("key1"));
        assert!(!tier.exists("other"));
    }

    #[tokio::test]
    async fn test_corrupt_entry_file_self_heals() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        std::fs::write(tmp.path().join(filename_for_key("key1")), b"garbage").unwrap();

        assert!(tier.get("key1").await.is_none());
        assert!(!tier.exists("key1"));
        assert_eq!(tier.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_entry_file_self_heals() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        std::fs::remove_file(tmp.path().join(filename_for_key("key1"))).unwrap();

        assert!(tier.get("key1").await.is_none());
        assert!(!tier.exists("key1"));
    }

    #[tokio::test]
    async fn test_clear_all_removes_files() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("key1", 8, None)).await.unwrap();
        tier.set(&entry("key2", 8, None)).await.unwrap();

        tier.clear_all().await.unwrap();

        assert_eq!(tier.entry_count(), 0);
        assert_eq!(tier.current_size(), 0);
        assert!(!tmp.path().join(filename_for_key("key1")).exists());
    }

    #[tokio::test]
    async fn test_clear_expired() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("short", 8, Some(1))).await.unwrap();
        tier.set(&entry("long", 8, Some(60))).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;

        let removed = tier.clear_expired().await;
        assert_eq!(removed, 1);
        assert!(tier.exists("long"));
        assert!(!tmp.path().join(filename_for_key("short")).exists());
    }

    #[tokio::test]
    async fn test_capacity_enforced_after_set() {
        let tmp = TempDir::new().unwrap();
        let mut tier = DiskTier::open(tmp.path(), 2_000, EvictionPolicy::Fifo)
            .await
            .unwrap();

        for i in 0..5 {
            tier.set(&entry(&format!("key{}", i), 500, None)).await.unwrap();
            assert!(tier.current_size() <= tier.max_size());
        }
    }

    #[tokio::test]
    async fn test_index_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let mut tier = open_tier(&tmp).await;
            tier.set(&entry("persisted", 16, None)).await.unwrap();
        }

        let mut tier = open_tier(&tmp).await;
        assert_eq!(tier.entry_count(), 1);
        let found = tier.get("persisted").await.unwrap();
        assert_eq!(found.payload, vec![7u8; 16]);
    }

    #[tokio::test]
    async fn test_corrupt_index_rebuilt_from_entry_files() {
        let tmp = TempDir::new().unwrap();
        {
            let mut tier = open_tier(&tmp).await;
            tier.set(&entry("kept", 16, None)).await.unwrap();
        }
        std::fs::write(tmp.path().join(INDEX_FILE_NAME), b"{not json").unwrap();

        let mut tier = open_tier(&tmp).await;
        assert_eq!(tier.entry_count(), 1);
        assert!(tier.get("kept").await.is_some());
    }

    #[tokio::test]
    async fn test_rebuild_discards_unreadable_entry_files() {
        let tmp = TempDir::new().unwrap();
        {
            let mut tier = open_tier(&tmp).await;
            tier.set(&entry("good", 16, None)).await.unwrap();
            tier.set(&entry("bad", 16, None)).await.unwrap();
        }
        std::fs::write(tmp.path().join(filename_for_key("bad")), b"garbage").unwrap();
        std::fs::remove_file(tmp.path().join(INDEX_FILE_NAME)).unwrap();

        let tier = open_tier(&tmp).await;
        assert_eq!(tier.entry_count(), 1);
        assert!(tier.exists("good"));
        assert!(!tier.exists("bad"));
        assert!(!tmp.path().join(filename_for_key("bad")).exists());
    }

    #[tokio::test]
    async fn test_update_max_size_evicts() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        for i in 0..6 {
            tier.set(&entry(&format!("key{}", i), 500, None)).await.unwrap();
        }
        let evicted = tier.update_max_size(1_500).await.unwrap();

        assert!(evicted > 0);
        assert!(tier.current_size() <= 1_500);
    }

    #[tokio::test]
    async fn test_validate_directory() {
        let tmp = TempDir::new().unwrap();
        let tier = open_tier(&tmp).await;
        assert!(tier.validate_directory().await);
    }

    #[tokio::test]
    async fn test_keys_for_eviction_preview() {
        let tmp = TempDir::new().unwrap();
        let mut tier = open_tier(&tmp).await;

        tier.set(&entry("old", 500, None)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        tier.set(&entry("new", 500, None)).await.unwrap();

        let preview = tier.keys_for_eviction(EvictionPolicy::Fifo);
        assert_eq!(preview.first().map(String::as_str), Some("old"));
        // Preview must not mutate the tier
        assert_eq!(tier.entry_count(), 2);
    }
}

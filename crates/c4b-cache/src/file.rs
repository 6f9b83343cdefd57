//! JSON-file backed content cache.
//!
//! [`FileContentCache`] keeps a map of absolute file path to SHA-256 hex digest
//! and persists it as a single pretty-printed document:
//!
//! ```text
//! {
//!   "version": 1,
//!   "files": {
//!     "/abs/path/src/README.md": "9f86d0..."
//!   }
//! }
//! ```
//!
//! A document with a different `version`, or one that does not have this
//! shape, is discarded as a whole. Entries are never partially trusted.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{ContentCache, absolute_key, content_hash};

/// Version of the persisted cache document.
pub const CACHE_VERSION: u32 = 1;

/// On-disk representation of the cache.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    version: u32,
    files: BTreeMap<String, String>,
}

/// [`ContentCache`] persisted as a versioned JSON document.
///
/// Construct with [`new`](Self::new) (empty) or [`open`](Self::open) (empty,
/// then [`load`](Self::load)). Mutations stay in memory until
/// [`persist`](ContentCache::persist) is called.
pub struct FileContentCache {
    cache_path: PathBuf,
    files: BTreeMap<String, String>,
}

impl FileContentCache {
    /// Create an empty cache that will persist to `cache_path`.
    #[must_use]
    pub fn new(cache_path: PathBuf) -> Self {
        Self {
            cache_path,
            files: BTreeMap::new(),
        }
    }

    /// Create a cache for `cache_path` and load any previously persisted state.
    #[must_use]
    pub fn open(cache_path: PathBuf) -> Self {
        let mut cache = Self::new(cache_path);
        cache.load();
        cache
    }

    /// Path of the persisted cache document.
    #[must_use]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Number of recorded files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Replace the in-memory state with the persisted document.
    ///
    /// Never fails: a missing, empty, unparseable or version-mismatched
    /// document leaves the cache empty.
    pub fn load(&mut self) {
        self.files.clear();

        if !self.cache_path.exists() {
            tracing::info!(path = %self.cache_path.display(), "No existing cache file found");
            return;
        }

        let raw = match fs::read_to_string(&self.cache_path) {
            Ok(raw) if !raw.trim().is_empty() => raw,
            Ok(_) => {
                tracing::warn!(path = %self.cache_path.display(), "Cache file is empty, ignoring it");
                return;
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.cache_path.display(),
                    error = %e,
                    "Cache file is unreadable, ignoring it"
                );
                return;
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    path = %self.cache_path.display(),
                    error = %e,
                    "Failed to parse cache file, ignoring it"
                );
                return;
            }
        };

        if value.get("version").and_then(serde_json::Value::as_u64) != Some(u64::from(CACHE_VERSION))
        {
            tracing::warn!(
                path = %self.cache_path.display(),
                "Cache file version mismatch, ignoring existing cache"
            );
            return;
        }

        match serde_json::from_value::<CacheDocument>(value) {
            Ok(document) => {
                self.files = document.files;
                tracing::info!(
                    path = %self.cache_path.display(),
                    entries = self.files.len(),
                    "Loaded cache"
                );
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.cache_path.display(),
                    error = %e,
                    "Cache file is corrupt, ignoring existing cache"
                );
            }
        }
    }

    /// Hash the current content of `path`, returning the cache key and digest.
    fn current_entry(path: &Path) -> Option<(String, String)> {
        let key = absolute_key(path)?;
        let bytes = fs::read(&key).ok()?;
        Some((key.to_string_lossy().into_owned(), content_hash(&bytes)))
    }
}

impl ContentCache for FileContentCache {
    fn has_changed(&self, path: &Path) -> bool {
        let Some((key, hash)) = Self::current_entry(path) else {
            tracing::warn!(path = %path.display(), "Cannot determine if file changed");
            return true;
        };
        self.files.get(&key) != Some(&hash)
    }

    fn mark_processed(&mut self, path: &Path) {
        let Some((key, hash)) = Self::current_entry(path) else {
            tracing::warn!(path = %path.display(), "Cannot mark file as processed");
            return;
        };
        self.files.insert(key, hash);
    }

    fn persist(&self) {
        let document = CacheDocument {
            version: CACHE_VERSION,
            files: self.files.clone(),
        };
        let serialized = match serde_json::to_string_pretty(&document) {
            Ok(serialized) => serialized,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize cache");
                return;
            }
        };

        if let Some(parent) = self.cache_path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = fs::create_dir_all(parent)
        {
            tracing::error!(path = %parent.display(), error = %e, "Failed to create cache directory");
            return;
        }

        match fs::write(&self.cache_path, serialized) {
            Ok(()) => tracing::info!(path = %self.cache_path.display(), "Persisted cache"),
            Err(e) => {
                tracing::error!(path = %self.cache_path.display(), error = %e, "Failed to write cache file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_unrecorded_file_has_changed() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "# Page");
        let cache = FileContentCache::new(tmp.path().join(".cache.json"));

        assert!(cache.has_changed(&file));
    }

    #[test]
    fn test_mark_processed_then_unchanged() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "# Page");
        let mut cache = FileContentCache::new(tmp.path().join(".cache.json"));

        cache.mark_processed(&file);

        assert!(!cache.has_changed(&file));
    }

    #[test]
    fn test_unchanged_after_persist_and_reload() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "# Page");
        let cache_path = tmp.path().join(".cache.json");

        let mut cache = FileContentCache::new(cache_path.clone());
        assert!(cache.has_changed(&file));
        cache.mark_processed(&file);
        cache.persist();

        let reloaded = FileContentCache::open(cache_path);
        assert_eq!(reloaded.len(), 1);
        assert!(!reloaded.has_changed(&file));
    }

    #[test]
    fn test_mutation_after_mark_is_detected() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "# Page");
        let mut cache = FileContentCache::new(tmp.path().join(".cache.json"));

        cache.mark_processed(&file);
        fs::write(&file, "# Page, edited").unwrap();

        assert!(cache.has_changed(&file));
    }

    #[test]
    fn test_unreadable_file_has_changed_and_is_not_recorded() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("missing.md");
        let mut cache = FileContentCache::new(tmp.path().join(".cache.json"));

        cache.mark_processed(&missing);

        assert!(cache.is_empty());
        assert!(cache.has_changed(&missing));
    }

    #[test]
    fn test_relative_and_absolute_paths_share_key() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "# Page");
        let dotted = tmp.path().join(".").join("page.md");
        let mut cache = FileContentCache::new(tmp.path().join(".cache.json"));

        cache.mark_processed(&dotted);

        assert_eq!(cache.len(), 1);
        assert!(!cache.has_changed(&file));
    }

    #[test]
    fn test_persisted_document_shape() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "content");
        let cache_path = tmp.path().join(".cache.json");

        let mut cache = FileContentCache::new(cache_path.clone());
        cache.mark_processed(&file);
        cache.persist();

        let raw = fs::read_to_string(&cache_path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], 1);
        let files = value["files"].as_object().unwrap();
        assert_eq!(files.len(), 1);
        let (key, hash) = files.iter().next().unwrap();
        assert!(Path::new(key).is_absolute());
        assert_eq!(hash.as_str().unwrap(), content_hash(b"content"));
        // Pretty-printed
        assert!(raw.contains('\n'));
    }

    #[test]
    fn test_missing_cache_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let cache = FileContentCache::open(tmp.path().join("nope.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_empty_cache_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let cache_path = write(tmp.path(), ".cache.json", "   \n");
        let cache = FileContentCache::open(cache_path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unparseable_cache_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let cache_path = write(tmp.path(), ".cache.json", "{ not json");
        let cache = FileContentCache::open(cache_path);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_version_mismatch_discards_cache() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "content");
        let key = absolute_key(&file).unwrap();
        let document = serde_json::json!({
            "version": 2,
            "files": { key.to_string_lossy(): content_hash(b"content") }
        });
        let cache_path = write(tmp.path(), ".cache.json", &document.to_string());

        let cache = FileContentCache::open(cache_path);

        assert!(cache.is_empty());
        assert!(cache.has_changed(&file));
    }

    #[test]
    fn test_malformed_files_discards_cache() {
        let tmp = TempDir::new().unwrap();
        let cache_path = write(
            tmp.path(),
            ".cache.json",
            r#"{"version": 1, "files": ["not", "a", "map"]}"#,
        );

        let cache = FileContentCache::open(cache_path);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_load_replaces_in_memory_state() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "page.md", "content");
        let mut cache = FileContentCache::new(tmp.path().join("never-written.json"));
        cache.mark_processed(&file);

        cache.load();

        assert!(cache.is_empty());
    }

    #[test]
    fn test_persist_creates_parent_directory() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join("nested/dir/.cache.json");
        let cache = FileContentCache::new(cache_path.clone());

        cache.persist();

        assert!(cache_path.exists());
    }
}

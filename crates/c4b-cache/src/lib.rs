//! Content-hash change tracking for c4b builds.
//!
//! This crate answers one question for the build pipeline: "has this source
//! file changed since the last build?". Two implementations share the
//! [`ContentCache`] trait:
//!
//! - [`NullContentCache`]: No-op implementation (every file is changed)
//! - [`FileContentCache`]: SHA-256 hashes persisted as a versioned JSON document
//!
//! Hashing is content-based rather than mtime-based, so the answer stays
//! correct across fresh checkouts where modification times are meaningless.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use c4b_cache::{ContentCache, NullContentCache};
//!
//! let mut cache = NullContentCache;
//! cache.mark_processed(Path::new("src/README.md"));
//! assert!(cache.has_changed(Path::new("src/README.md"))); // NullContentCache never remembers
//! ```

mod file;
pub use file::{CACHE_VERSION, FileContentCache};

use std::path::{Component, Path, PathBuf};

use sha2::{Digest, Sha256};

/// Change detection keyed by absolute file path.
///
/// None of the operations fail: unreadable files are reported as changed and
/// persistence problems are logged. A broken cache can only degrade a build to
/// "process everything".
pub trait ContentCache {
    /// Whether the file's current bytes differ from the last recorded hash.
    ///
    /// Returns `true` when the file cannot be read or was never recorded.
    fn has_changed(&self, path: &Path) -> bool;

    /// Record the current hash of the file.
    ///
    /// Does nothing (besides a warning) when the file cannot be read.
    fn mark_processed(&mut self, path: &Path);

    /// Write the recorded hashes to durable storage.
    fn persist(&self);
}

/// No-op [`ContentCache`] that never remembers anything.
///
/// Every file is reported as changed. Used when caching is disabled or a
/// clean build was requested.
pub struct NullContentCache;

impl ContentCache for NullContentCache {
    fn has_changed(&self, _path: &Path) -> bool {
        true
    }

    fn mark_processed(&mut self, _path: &Path) {}

    fn persist(&self) {}
}

/// Compute the hex-encoded SHA-256 digest of `bytes`.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Resolve `path` against the current directory and drop `.`/`..` segments.
///
/// Cache keys must not depend on how the caller spelled the path.
pub(crate) fn absolute_key(path: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Some(normalized)
}

//! Download cache for remote backends.
//!
//! Entries are keyed by [`cache_key`] and remember the validator (`ETag`) the
//! server sent with them, so the HTTP backend can revalidate with
//! `If-None-Match` instead of downloading again.
//!
//! [`DirCache`] keeps one directory per cache, which the cache owns outright:
//!
//! ```text
//! {cache_dir}/
//! +-- mdsource-http/        # owned by DirCache; nothing else is touched
//!     +-- FORMAT            # layout version, directory is reset on mismatch
//!     +-- 3f9a....body      # downloaded bytes
//!     +-- 3f9a....etag      # validator, absent when the server sent none
//! ```
//!
//! Cache failures are logged and never fatal.

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

/// Name of the layout marker inside an owned cache directory.
const FORMAT_FILE: &str = "FORMAT";

/// A downloaded file and its validator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedEntry {
    /// `ETag` sent by the server, if any.
    pub etag: Option<String>,
    /// Downloaded bytes.
    pub data: Vec<u8>,
}

/// Storage for downloaded files.
pub trait DownloadCache: Send + Sync {
    /// Look up an entry.
    fn load(&self, key: &str) -> Option<CachedEntry>;

    /// Store an entry, replacing any previous one for the key.
    fn store(&self, key: &str, entry: &CachedEntry);
}

/// Cache that never holds anything; used when no cache directory is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

impl DownloadCache for NoCache {
    fn load(&self, _key: &str) -> Option<CachedEntry> {
        None
    }

    fn store(&self, _key: &str, _entry: &CachedEntry) {}
}

/// Cache key for a remote location: hex SHA-256 of the full URL.
#[must_use]
pub fn cache_key(location: &str) -> String {
    hex::encode(Sha256::digest(location.as_bytes()))
}

/// Directory-backed [`DownloadCache`].
#[derive(Debug)]
pub struct DirCache {
    dir: PathBuf,
}

impl DirCache {
    /// Open the cache in `dir`, which must be a directory this cache owns.
    ///
    /// When the recorded layout differs from `format`, previous entries are
    /// removed from `dir`; nothing outside `dir` is ever modified.
    #[must_use]
    pub fn open(dir: PathBuf, format: &str) -> Self {
        reset_on_format_change(&dir, format);
        Self { dir }
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn body_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.body"))
    }

    fn etag_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.etag"))
    }
}

impl DownloadCache for DirCache {
    fn load(&self, key: &str) -> Option<CachedEntry> {
        let data = fs::read(self.body_path(key)).ok()?;
        let etag = fs::read_to_string(self.etag_path(key)).ok();
        Some(CachedEntry { etag, data })
    }

    fn store(&self, key: &str, entry: &CachedEntry) {
        // Body last: a present body always has its matching validator.
        let staged = self.dir.join(format!("{key}.part"));
        let result = fs::write(&staged, &entry.data)
            .and_then(|()| match &entry.etag {
                Some(etag) => fs::write(self.etag_path(key), etag),
                None => match fs::remove_file(self.etag_path(key)) {
                    Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
                    _ => Ok(()),
                },
            })
            .and_then(|()| fs::rename(&staged, self.body_path(key)));

        if let Err(e) = result {
            warn!(key, dir = %self.dir.display(), "failed to store cache entry: {e}");
        }
    }
}

/// Make `dir` hold an empty cache of layout `format` unless it already does.
fn reset_on_format_change(dir: &Path, format: &str) {
    let marker = dir.join(FORMAT_FILE);
    match fs::read_to_string(&marker) {
        Ok(stored) if stored == format => {
            debug!(dir = %dir.display(), "reusing download cache");
            return;
        }
        Ok(stored) => info!(
            dir = %dir.display(),
            %stored,
            expected = format,
            "download cache layout changed, clearing"
        ),
        Err(_) => info!(dir = %dir.display(), "initializing download cache"),
    }

    if dir.exists()
        && let Err(e) = fs::remove_dir_all(dir)
    {
        warn!(dir = %dir.display(), "failed to clear download cache: {e}");
    }
    if let Err(e) = fs::create_dir_all(dir).and_then(|()| fs::write(&marker, format)) {
        warn!(dir = %dir.display(), "failed to initialize download cache: {e}");
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn entry(etag: Option<&str>, data: &[u8]) -> CachedEntry {
        CachedEntry {
            etag: etag.map(str::to_owned),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_no_cache_always_misses() {
        NoCache.store("key", &entry(Some("\"a\""), b"hello"));

        assert_eq!(NoCache.load("key"), None);
    }

    #[test]
    fn test_store_and_load() {
        let tmp = TempDir::new().unwrap();
        let cache = DirCache::open(tmp.path().join("http"), "1");

        cache.store("k", &entry(Some("\"v1\""), b"# Remote"));

        assert_eq!(cache.load("k"), Some(entry(Some("\"v1\""), b"# Remote")));
        assert_eq!(cache.load("other"), None);
    }

    #[test]
    fn test_store_without_etag_clears_old_validator() {
        let tmp = TempDir::new().unwrap();
        let cache = DirCache::open(tmp.path().join("http"), "1");

        cache.store("k", &entry(Some("\"v1\""), b"old"));
        cache.store("k", &entry(None, b"new"));

        assert_eq!(cache.load("k"), Some(entry(None, b"new")));
    }

    #[test]
    fn test_format_change_clears_entries() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("http");

        DirCache::open(dir.clone(), "1").store("k", &entry(None, b"old"));
        let cache = DirCache::open(dir.clone(), "2");

        assert_eq!(cache.load("k"), None);
        assert_eq!(fs::read_to_string(dir.join(FORMAT_FILE)).unwrap(), "2");
    }

    #[test]
    fn test_reset_stays_inside_owned_directory() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("thesis.txt"), "keep me").unwrap();

        let _ = DirCache::open(tmp.path().join("http"), "1");
        let _ = DirCache::open(tmp.path().join("http"), "2");

        assert_eq!(
            fs::read_to_string(tmp.path().join("thesis.txt")).unwrap(),
            "keep me"
        );
    }

    #[test]
    fn test_cache_key_is_stable_hex() {
        let key = cache_key("https://example.com/a.md");

        assert_eq!(key.len(), 64);
        assert_eq!(key, cache_key("https://example.com/a.md"));
        assert_ne!(key, cache_key("https://example.com/b.md"));
    }
}

//! In-memory backend for testing.
//!
//! Provides [`MemoryFileSystem`] for unit testing without filesystem or
//! network access. It counts glob expansions and tracks open readers so tests
//! can assert that resolution happens once and that every handle is released.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::{StorageError, StorageErrorKind};
use crate::filesystem::{FileSystem, split_protocol};
use crate::fs::has_magic;

/// Backend identifier for error messages.
const BACKEND: &str = "Memory";

/// Stored entry: readable content or a file whose reads fail.
#[derive(Debug, Clone)]
enum Entry {
    Content(Vec<u8>),
    Unreadable,
}

/// In-memory backend serving `memory://` locations.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use mdsource_storage::{MemoryFileSystem, OpenOptions, Registry, open_files};
///
/// let memory = Arc::new(
///     MemoryFileSystem::new()
///         .with_file("docs/a.md", "# A")
///         .with_file("docs/b.md", "# B"),
/// );
/// let registry = Registry::empty().register(memory.clone());
///
/// let files = open_files(&["memory://docs/*.md".to_owned()], &OpenOptions::default(), &registry)
///     .unwrap();
/// assert_eq!(files.len(), 2);
/// assert_eq!(memory.expand_calls(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeMap<String, Entry>>,
    expand_calls: AtomicUsize,
    open_calls: AtomicUsize,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryFileSystem {
    /// Create an empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file. `path` is given without the `memory://` prefix.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files
            .write()
            .unwrap()
            .insert(path.into(), Entry::Content(content.into()));
        self
    }

    /// Add a file that opens successfully but fails on read.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_unreadable_file(self, path: impl Into<String>) -> Self {
        self.files
            .write()
            .unwrap()
            .insert(path.into(), Entry::Unreadable);
        self
    }

    /// Number of `expand` calls so far.
    pub fn expand_calls(&self) -> usize {
        self.expand_calls.load(Ordering::SeqCst)
    }

    /// Number of successful `open` calls so far.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// Number of readers currently alive.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl FileSystem for MemoryFileSystem {
    fn protocols(&self) -> &'static [&'static str] {
        &["memory"]
    }

    fn expand(&self, target: &str) -> Result<Vec<String>, StorageError> {
        self.expand_calls.fetch_add(1, Ordering::SeqCst);
        let (_, path) = split_protocol(target);
        if !has_magic(path) {
            return Ok(vec![format!("memory://{path}")]);
        }

        let pattern = glob::Pattern::new(path).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidPath)
                .with_location(target)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        let files = self.files.read().unwrap();
        Ok(files
            .keys()
            .filter(|key| pattern.matches(key))
            .map(|key| format!("memory://{key}"))
            .collect())
    }

    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let (_, path) = split_protocol(location);
        let entry = self
            .files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::not_found(location).with_backend(BACKEND))?;

        self.open_calls.fetch_add(1, Ordering::SeqCst);
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryReader {
            entry,
            cursor: 0,
            handles: Arc::clone(&self.open_handles),
        }))
    }
}

/// Reader over an in-memory entry; releases its handle on drop.
struct MemoryReader {
    entry: Entry,
    cursor: usize,
    handles: Arc<AtomicUsize>,
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &self.entry {
            Entry::Unreadable => Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "read not permitted",
            )),
            Entry::Content(bytes) => {
                let mut cursor = Cursor::new(&bytes[self.cursor..]);
                let n = cursor.read(buf)?;
                self.cursor += n;
                Ok(n)
            }
        }
    }
}

impl Drop for MemoryReader {
    fn drop(&mut self) {
        self.handles.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_expand_glob_sorted() {
        let fs = MemoryFileSystem::new()
            .with_file("docs/b.md", "B")
            .with_file("docs/a.md", "A")
            .with_file("other/c.md", "C");

        let paths = fs.expand("memory://docs/*.md").unwrap();

        assert_eq!(paths, vec!["memory://docs/a.md", "memory://docs/b.md"]);
        assert_eq!(fs.expand_calls(), 1);
    }

    #[test]
    fn test_open_and_release() {
        let fs = MemoryFileSystem::new().with_file("a.md", "hello");

        let mut reader = fs.open("memory://a.md").unwrap();
        assert_eq!(fs.open_handles(), 1);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        drop(reader);

        assert_eq!(out, "hello");
        assert_eq!(fs.open_handles(), 0);
        assert_eq!(fs.open_calls(), 1);
    }

    #[test]
    fn test_unreadable_file_fails_on_read() {
        let fs = MemoryFileSystem::new().with_unreadable_file("locked.md");

        let mut reader = fs.open("memory://locked.md").unwrap();
        let err = reader.read_to_end(&mut Vec::new()).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_open_missing() {
        let fs = MemoryFileSystem::new();

        let err = fs.open("memory://missing.md").err().unwrap();

        assert_eq!(err.kind, StorageErrorKind::NotFound);
        assert_eq!(fs.open_handles(), 0);
    }
}

//! Local filesystem backend.
//!
//! Serves bare paths and `file://` URLs. Glob patterns are expanded with the
//! [`glob`] crate; `~` is expanded to the home directory.

use std::fs::File;
use std::io::Read;

use tracing::debug;

use crate::error::{StorageError, StorageErrorKind};
use crate::filesystem::{FileSystem, split_protocol};

/// Backend identifier for error messages.
const BACKEND: &str = "File";

/// Whether a path contains glob metacharacters.
#[must_use]
pub fn has_magic(path: &str) -> bool {
    path.contains(['*', '?', '['])
}

/// Local filesystem backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    /// Strip the protocol and expand `~`.
    fn local_path(target: &str) -> String {
        let (_, path) = split_protocol(target);
        shellexpand::tilde(path).into_owned()
    }
}

impl FileSystem for LocalFileSystem {
    fn protocols(&self) -> &'static [&'static str] {
        &["file"]
    }

    fn expand(&self, target: &str) -> Result<Vec<String>, StorageError> {
        let path = Self::local_path(target);
        if !has_magic(&path) {
            return Ok(vec![path]);
        }

        let entries = glob::glob(&path).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidPath)
                .with_location(target)
                .with_backend(BACKEND)
                .with_source(e)
        })?;

        let mut matches = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                let location = e.path().display().to_string();
                let source: std::io::Error = e.into();
                StorageError::io(source, Some(&location)).with_backend(BACKEND)
            })?;
            if entry.is_file() {
                matches.push(entry.to_string_lossy().into_owned());
            }
        }
        matches.sort();

        debug!(pattern = %path, count = matches.len(), "expanded glob");
        Ok(matches)
    }

    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let path = Self::local_path(location);
        let file =
            File::open(&path).map_err(|e| StorageError::io(e, Some(&path)).with_backend(BACKEND))?;
        Ok(Box::new(file))
    }
}

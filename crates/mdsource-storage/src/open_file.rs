//! Resolved file handles and target expansion.

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::error::StorageError;
use crate::filesystem::{FileSystem, Registry};
use crate::options::{Compression, OpenOptions, TextEncoding};

/// An openable file: a concrete location plus everything needed to read it.
///
/// Holding an `OpenFile` keeps nothing open. Each [`open`](Self::open) acquires
/// a fresh reader that is released when dropped, so handles can be cloned and
/// opened from any number of threads.
#[derive(Clone)]
pub struct OpenFile {
    location: String,
    fs: Arc<dyn FileSystem>,
    compression: Compression,
    encoding: TextEncoding,
}

impl OpenFile {
    /// Create a handle for a concrete location on `fs`.
    ///
    /// `compression` is resolved against the location, so `Infer` never
    /// reaches the reader.
    #[must_use]
    pub fn new(
        location: impl Into<String>,
        fs: Arc<dyn FileSystem>,
        compression: Compression,
        encoding: TextEncoding,
    ) -> Self {
        let location = location.into();
        let compression = compression.resolve(&location);
        Self {
            location,
            fs,
            compression,
            encoding,
        }
    }

    /// Concrete location (path or URL).
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Resolved decompression codec.
    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Text encoding used by [`decode`](Self::decode).
    #[must_use]
    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Acquire a decompressing reader over the file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] from the backend if the file can't be opened.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, StorageError> {
        Ok(self.compression.wrap(self.fs.open(&self.location)?))
    }

    /// Decode bytes read from this file under its text encoding.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the bytes are invalid for the encoding.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, StorageError> {
        self.encoding.decode(bytes, &self.location)
    }

    /// Read the whole file as text.
    ///
    /// The reader is dropped before decoding, on every path including read
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] for open, read or decode failures.
    pub fn read_text(&self) -> Result<String, StorageError> {
        let bytes = {
            let mut reader = self.open()?;
            let mut bytes = Vec::new();
            reader
                .read_to_end(&mut bytes)
                .map_err(|e| StorageError::io(e, Some(&self.location)))?;
            bytes
        };
        self.decode(&bytes)
    }
}

impl fmt::Debug for OpenFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenFile")
            .field("location", &self.location)
            .field("compression", &self.compression)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

/// Expand targets into an ordered list of openable files.
///
/// Targets are processed in order; each glob contributes its matches in
/// sorted order. Targets matching nothing contribute nothing, so an empty
/// result is valid. Backend errors (unknown protocol, malformed glob) are
/// returned untranslated.
///
/// # Errors
///
/// Returns the first [`StorageError`] raised while expanding a target.
pub fn open_files(
    targets: &[String],
    options: &OpenOptions,
    registry: &Registry,
) -> Result<Vec<OpenFile>, StorageError> {
    let mut files = Vec::new();
    for target in targets {
        let fs = registry.lookup(target)?;
        let locations = fs.expand(target)?;
        debug!(target = %target, matched = locations.len(), "resolved target");
        files.extend(locations.into_iter().map(|location| {
            OpenFile::new(
                location,
                Arc::clone(&fs),
                options.compression,
                options.encoding,
            )
        }));
    }
    Ok(files)
}

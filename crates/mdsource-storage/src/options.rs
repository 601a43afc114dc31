//! Options controlling how resolved files are opened and decoded.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use std::str::FromStr;

use encoding_rs::Encoding;
use serde::Deserialize;

use crate::error::{StorageError, StorageErrorKind};

/// Text encoding applied when decoding file contents.
///
/// Wraps an [`encoding_rs`] encoding looked up by WHATWG label, so the common
/// spellings (`utf8`, `utf-8`, `latin1`, `shift_jis`, ...) are all accepted.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    /// UTF-8, the default.
    pub const UTF_8: Self = Self(encoding_rs::UTF_8);

    /// Look up an encoding by label.
    ///
    /// # Errors
    ///
    /// Returns an [`StorageErrorKind::InvalidOption`] error for unknown labels.
    pub fn from_label(label: &str) -> Result<Self, StorageError> {
        Encoding::for_label(label.trim().as_bytes())
            .map(Self)
            .ok_or_else(|| StorageError::invalid_option(format!("unknown text encoding: {label}")))
    }

    /// Canonical encoding name (e.g., "UTF-8").
    #[must_use]
    pub fn name(self) -> &'static str {
        self.0.name()
    }

    /// Strictly decode bytes. Malformed sequences are an error, never replaced.
    ///
    /// A byte order mark is kept as content, matching a plain `utf8` codec.
    pub fn decode(self, bytes: &[u8], location: &str) -> Result<String, StorageError> {
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
            .map(Cow::into_owned)
            .ok_or_else(|| {
                StorageError::new(StorageErrorKind::Decode)
                    .with_message(format!("content is not valid {}", self.name()))
                    .with_location(location)
            })
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::UTF_8
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextEncoding").field(&self.name()).finish()
    }
}

/// Decompression codec applied to raw bytes before decoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// Read bytes as stored.
    #[default]
    None,
    /// gzip (`.gz`).
    Gzip,
    /// bzip2 (`.bz2`).
    Bz2,
    /// Pick a codec from the file suffix.
    Infer,
}

impl Compression {
    /// Resolve [`Compression::Infer`] against a concrete path.
    ///
    /// Query strings and fragments are ignored so remote URLs infer from
    /// their path component.
    #[must_use]
    pub fn resolve(self, path: &str) -> Self {
        if self != Self::Infer {
            return self;
        }
        let path = path.split(['?', '#']).next().unwrap_or(path);
        if path.ends_with(".gz") {
            Self::Gzip
        } else if path.ends_with(".bz2") {
            Self::Bz2
        } else {
            Self::None
        }
    }

    /// Wrap a raw reader in the matching decoder.
    ///
    /// Multi-member streams are read to the end, like `gzip`/`bzip2` tools do.
    /// `Infer` must be resolved first; unresolved it reads bytes as stored.
    #[must_use]
    pub fn wrap(self, reader: Box<dyn Read + Send>) -> Box<dyn Read + Send> {
        match self {
            Self::None | Self::Infer => reader,
            Self::Gzip => Box::new(flate2::read::MultiGzDecoder::new(reader)),
            Self::Bz2 => Box::new(bzip2::read::MultiBzDecoder::new(reader)),
        }
    }
}

impl FromStr for Compression {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "gzip" | "gz" => Ok(Self::Gzip),
            "bz2" | "bzip2" => Ok(Self::Bz2),
            "infer" => Ok(Self::Infer),
            other => Err(StorageError::invalid_option(format!(
                "unknown compression codec: {other}"
            ))),
        }
    }
}

/// Backend-specific storage options.
///
/// Recognized keys are typed fields; anything else lands in `extra`, where
/// each backend picks the keys it documents. [`Registry::new`] rejects keys
/// that no registered backend consumes.
///
/// [`Registry::new`]: crate::Registry::new
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageOptions {
    /// Local directory for caching remote downloads. Disabled when unset.
    pub cache_dir: Option<PathBuf>,
    /// Network timeout in seconds for remote backends.
    pub timeout_secs: Option<u64>,
    /// Extra request headers for remote backends (credentials, tokens).
    pub headers: BTreeMap<String, String>,
    /// Backend-specific options (see [`HttpFileSystem`](crate::HttpFileSystem)).
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

/// Everything needed to turn a location into readable text.
#[derive(Clone, Debug, Default)]
pub struct OpenOptions {
    /// Text encoding for decoding file bytes.
    pub encoding: TextEncoding,
    /// Decompression codec, or [`Compression::Infer`].
    pub compression: Compression,
    /// Backend options.
    pub storage: StorageOptions,
}

//! Backend trait and protocol registry.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::sync::Arc;

use crate::error::{StorageError, StorageErrorKind};
use crate::fs::LocalFileSystem;
use crate::http::HttpFileSystem;
use crate::options::StorageOptions;

/// A file-access backend for one or more URL protocols.
///
/// Implementations must be shareable across threads: a resolved file handle
/// keeps an `Arc` to its backend and may be opened from any thread.
///
/// # Location Convention
///
/// Locations passed to [`expand`](Self::expand) and [`open`](Self::open) are
/// full target strings including any protocol prefix (`file://`, `https://`,
/// `memory://`). Bare paths belong to the `file` protocol.
pub trait FileSystem: Send + Sync {
    /// Protocols served by this backend (e.g., `["http", "https"]`).
    fn protocols(&self) -> &'static [&'static str];

    /// Keys of [`StorageOptions::extra`] this backend consumes.
    fn option_keys(&self) -> &'static [&'static str] {
        &[]
    }

    /// Expand a target into concrete, openable locations.
    ///
    /// Glob patterns expand to their matches in sorted order; a pattern with no
    /// matches yields an empty list. Literal locations are returned as-is
    /// without checking that they exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] for malformed patterns or listing failures.
    fn expand(&self, target: &str) -> Result<Vec<String>, StorageError>;

    /// Acquire a fresh reader over the raw (still compressed) bytes.
    ///
    /// The reader owns the underlying handle; dropping it releases the handle.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the location doesn't exist or can't be opened.
    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, StorageError>;
}

/// Split a target into its protocol and remainder.
///
/// Targets without `://` belong to the `file` protocol.
#[must_use]
pub fn split_protocol(target: &str) -> (&str, &str) {
    match target.split_once("://") {
        Some((protocol, rest)) if !protocol.is_empty() => (protocol, rest),
        _ => ("file", target),
    }
}

/// Maps URL protocols to backends.
#[derive(Clone)]
pub struct Registry {
    backends: BTreeMap<&'static str, Arc<dyn FileSystem>>,
}

impl Registry {
    /// Registry without any backends.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            backends: BTreeMap::new(),
        }
    }

    /// Registry with the local filesystem and HTTP(S) backends, configured
    /// from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::InvalidOption`] for malformed option values
    /// and for `extra` keys that no backend consumes.
    pub fn new(options: &StorageOptions) -> Result<Self, StorageError> {
        let registry = Self::empty()
            .register(Arc::new(LocalFileSystem))
            .register(Arc::new(HttpFileSystem::new(options)?));
        registry.check_options(options)?;
        Ok(registry)
    }

    /// Reject `extra` keys that no registered backend consumes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::InvalidOption`] naming the first unknown key.
    pub fn check_options(&self, options: &StorageOptions) -> Result<(), StorageError> {
        let unknown = options.extra.keys().find(|key| {
            !self
                .backends
                .values()
                .any(|backend| backend.option_keys().contains(&key.as_str()))
        });
        match unknown {
            Some(key) => Err(StorageError::invalid_option(format!(
                "unknown storage option {key:?} (registered protocols: {})",
                self.protocols().collect::<Vec<_>>().join(", ")
            ))),
            None => Ok(()),
        }
    }

    /// Register a backend for every protocol it serves.
    ///
    /// Later registrations replace earlier ones for the same protocol.
    #[must_use]
    pub fn register(mut self, backend: Arc<dyn FileSystem>) -> Self {
        for &protocol in backend.protocols() {
            self.backends.insert(protocol, Arc::clone(&backend));
        }
        self
    }

    /// Registered protocol names, sorted.
    pub fn protocols(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.backends.keys().copied()
    }

    /// Find the backend serving a target's protocol.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::UnsupportedProtocol`] when nothing is registered
    /// for the protocol.
    pub fn lookup(&self, target: &str) -> Result<Arc<dyn FileSystem>, StorageError> {
        let (protocol, _) = split_protocol(target);
        self.backends
            .get(protocol)
            .map(Arc::clone)
            .ok_or_else(|| {
                StorageError::new(StorageErrorKind::UnsupportedProtocol)
                    .with_message(format!("no backend registered for {protocol}://"))
                    .with_location(target)
            })
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("protocols", &self.backends.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_split_protocol() {
        assert_eq!(split_protocol("docs/a.md"), ("file", "docs/a.md"));
        assert_eq!(split_protocol("file:///tmp/a.md"), ("file", "/tmp/a.md"));
        assert_eq!(
            split_protocol("https://example.com/a.md"),
            ("https", "example.com/a.md")
        );
        assert_eq!(split_protocol("://odd"), ("file", "://odd"));
    }

    fn default_registry() -> Registry {
        Registry::new(&StorageOptions::default()).unwrap()
    }

    #[test]
    fn test_default_registry_protocols() {
        let registry = default_registry();

        assert_eq!(
            registry.protocols().collect::<Vec<_>>(),
            vec!["file", "http", "https"]
        );
    }

    #[test]
    fn test_lookup_unsupported_protocol() {
        let registry = default_registry();

        let err = registry.lookup("s3://bucket/a.md").err().unwrap();

        assert_eq!(err.kind, StorageErrorKind::UnsupportedProtocol);
        assert_eq!(err.location.as_deref(), Some("s3://bucket/a.md"));
    }

    #[test]
    fn test_empty_registry_has_no_file_backend() {
        let err = Registry::empty().lookup("a.md").err().unwrap();

        assert_eq!(err.kind, StorageErrorKind::UnsupportedProtocol);
    }

    #[test]
    fn test_extra_options_consumed_by_backend() {
        let mut options = StorageOptions::default();
        options
            .extra
            .insert("user_agent".to_owned(), "docs-bot/1.0".to_owned());

        assert!(Registry::new(&options).is_ok());
    }

    #[test]
    fn test_unknown_extra_option_rejected() {
        let mut options = StorageOptions::default();
        options
            .extra
            .insert("region".to_owned(), "eu-west-1".to_owned());

        let err = Registry::new(&options).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidOption);
        assert!(err.to_string().contains("\"region\""));
    }

    #[test]
    fn test_check_options_against_custom_registry() {
        let mut options = StorageOptions::default();
        options
            .extra
            .insert("user_agent".to_owned(), "docs-bot/1.0".to_owned());

        assert!(Registry::empty().check_options(&options).is_err());
        assert!(Registry::empty().check_options(&StorageOptions::default()).is_ok());
    }
}

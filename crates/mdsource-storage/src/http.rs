//! HTTP(S) backend.
//!
//! Fetches remote files with a blocking [`ureq`] agent. When a cache directory
//! is configured, downloads are kept in a [`DirCache`] under
//! `{cache_dir}/mdsource-http` and revalidated with `If-None-Match` on every
//! open: a `304` serves the cached bytes, a `200` replaces them. When the
//! server can't be reached, a cached copy is served instead of failing.
//!
//! Backend-specific keys accepted in [`StorageOptions::extra`]:
//!
//! | key             | effect                               |
//! |-----------------|--------------------------------------|
//! | `user_agent`    | `User-Agent` request header          |
//! | `max_redirects` | redirect limit (integer, default 10) |

use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use tracing::{debug, warn};
use ureq::Agent;
use url::Url;

use crate::cache::{CachedEntry, DirCache, DownloadCache, NoCache, cache_key};
use crate::error::{ErrorStatus, StorageError, StorageErrorKind};
use crate::filesystem::FileSystem;
use crate::options::StorageOptions;

/// Backend identifier for error messages.
const BACKEND: &str = "Http";

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 30;

/// Subdirectory of `cache_dir` owned by this backend.
const CACHE_SUBDIR: &str = "mdsource-http";

/// Cache layout version.
const CACHE_FORMAT: &str = "1";

/// Keys of [`StorageOptions::extra`] this backend consumes.
const OPTION_KEYS: &[&str] = &["user_agent", "max_redirects"];

/// Outcome of a conditional download.
enum Fetched {
    /// The server confirmed the cached copy is current.
    NotModified,
    /// New content.
    Body(CachedEntry),
}

/// HTTP(S) backend.
pub struct HttpFileSystem {
    agent: Agent,
    headers: Vec<(String, String)>,
    cache_dir: Option<PathBuf>,
    cache: OnceLock<Box<dyn DownloadCache>>,
}

impl HttpFileSystem {
    /// Create a backend from storage options (timeout, headers, cache
    /// directory and the `extra` keys listed in the module docs).
    ///
    /// Nothing is created on disk until the first [`open`](FileSystem::open).
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::InvalidOption`] for a malformed
    /// `max_redirects` value.
    pub fn new(options: &StorageOptions) -> Result<Self, StorageError> {
        let timeout = options.timeout_secs.unwrap_or(DEFAULT_TIMEOUT);
        let mut config = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(timeout)))
            .http_status_as_error(false);

        let mut headers: Vec<(String, String)> = options
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if let Some(agent) = options.extra.get("user_agent") {
            headers.push(("User-Agent".to_owned(), agent.clone()));
        }
        if let Some(value) = options.extra.get("max_redirects") {
            let limit = value.parse::<u32>().map_err(|e| {
                StorageError::invalid_option(format!(
                    "max_redirects must be a non-negative integer, got {value:?}"
                ))
                .with_backend(BACKEND)
                .with_source(e)
            })?;
            config = config.max_redirects(limit);
        }

        Ok(Self {
            agent: config.build().into(),
            headers,
            cache_dir: options.cache_dir.as_ref().map(|dir| dir.join(CACHE_SUBDIR)),
            cache: OnceLock::new(),
        })
    }

    /// Download cache, opened on first use.
    fn cache(&self) -> &dyn DownloadCache {
        let cache = self.cache.get_or_init(|| -> Box<dyn DownloadCache> {
            match &self.cache_dir {
                Some(dir) => Box::new(DirCache::open(dir.clone(), CACHE_FORMAT)),
                None => Box::new(NoCache),
            }
        });
        &**cache
    }

    /// Download a URL, conditionally when a validator is known.
    fn fetch(&self, url: &str, etag: Option<&str>) -> Result<Fetched, StorageError> {
        debug!(url, revalidate = etag.is_some(), "fetching remote file");

        let mut request = self.agent.get(url);
        for (name, value) in &self.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(etag) = etag {
            request = request.header("If-None-Match", etag);
        }
        let response = request.call().map_err(|e| request_error(e, url))?;

        let status = response.status().as_u16();
        if status == 304 && etag.is_some() {
            return Ok(Fetched::NotModified);
        }
        if status >= 300 {
            return Err(status_error(status, url));
        }

        let etag = response
            .headers()
            .get("etag")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);

        let mut data = Vec::new();
        response
            .into_body()
            .into_reader()
            .read_to_end(&mut data)
            .map_err(|e| StorageError::io(e, Some(url)).with_backend(BACKEND))?;

        Ok(Fetched::Body(CachedEntry { etag, data }))
    }
}

impl std::fmt::Debug for HttpFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFileSystem")
            .field("headers", &self.headers.len())
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl FileSystem for HttpFileSystem {
    fn protocols(&self) -> &'static [&'static str] {
        &["http", "https"]
    }

    fn option_keys(&self) -> &'static [&'static str] {
        OPTION_KEYS
    }

    fn expand(&self, target: &str) -> Result<Vec<String>, StorageError> {
        let url = Url::parse(target).map_err(|e| {
            StorageError::new(StorageErrorKind::InvalidPath)
                .with_location(target)
                .with_backend(BACKEND)
                .with_source(e)
        })?;
        // '?' starts a query string and brackets delimit IPv6 hosts, so only
        // the path is checked.
        if url.path().contains(['*', '[']) {
            return Err(StorageError::new(StorageErrorKind::InvalidPath)
                .with_message("glob patterns are not supported for remote URLs")
                .with_location(target)
                .with_backend(BACKEND));
        }
        Ok(vec![target.to_owned()])
    }

    fn open(&self, location: &str) -> Result<Box<dyn Read + Send>, StorageError> {
        let key = cache_key(location);
        let cached = self.cache().load(&key);
        let etag = cached.as_ref().and_then(|entry| entry.etag.as_deref());

        let data = match (self.fetch(location, etag), cached) {
            (Ok(Fetched::Body(entry)), _) => {
                self.cache().store(&key, &entry);
                entry.data
            }
            (Ok(Fetched::NotModified), Some(entry)) => {
                debug!(url = location, "cached copy is current");
                entry.data
            }
            (Ok(Fetched::NotModified), None) => {
                return Err(status_error(304, location));
            }
            (Err(err), Some(entry))
                if matches!(
                    err.kind,
                    StorageErrorKind::Unavailable | StorageErrorKind::Timeout
                ) =>
            {
                warn!(url = location, "serving cached copy, server unreachable: {err}");
                entry.data
            }
            (Err(err), _) => return Err(err),
        };
        Ok(Box::new(Cursor::new(data)))
    }
}

/// Map a transport-level failure.
fn request_error(err: ureq::Error, url: &str) -> StorageError {
    let (kind, status) = match &err {
        ureq::Error::Timeout(_) => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
            (StorageErrorKind::Unavailable, ErrorStatus::Temporary)
        }
        ureq::Error::Io(io) => match io.kind() {
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted => {
                (StorageErrorKind::Unavailable, ErrorStatus::Temporary)
            }
            std::io::ErrorKind::TimedOut => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
            _ => (StorageErrorKind::Other, ErrorStatus::Permanent),
        },
        _ => (StorageErrorKind::Other, ErrorStatus::Permanent),
    };
    StorageError::new(kind)
        .with_status(status)
        .with_location(url)
        .with_backend(BACKEND)
        .with_source(err)
}

/// Map an HTTP error status.
fn status_error(status: u16, url: &str) -> StorageError {
    let (kind, retry) = match status {
        404 | 410 => (StorageErrorKind::NotFound, ErrorStatus::Permanent),
        401 | 403 => (StorageErrorKind::PermissionDenied, ErrorStatus::Permanent),
        408 => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
        429 => (StorageErrorKind::RateLimited, ErrorStatus::Persistent),
        502..=504 => (StorageErrorKind::Unavailable, ErrorStatus::Persistent),
        _ => (StorageErrorKind::Other, ErrorStatus::Permanent),
    };
    StorageError::new(kind)
        .with_status(retry)
        .with_message(format!("HTTP {status}"))
        .with_location(url)
        .with_backend(BACKEND)
}

//! File-opening backend for mdsource.
//!
//! Turns target locations (local paths, glob patterns, remote URLs) into an
//! ordered list of [`OpenFile`] handles, each of which can be opened, read and
//! released independently.
//!
//! # Architecture
//!
//! The crate provides:
//! - [`FileSystem`] trait with `expand()` and `open()` methods
//! - [`LocalFileSystem`] for bare paths and `file://` URLs
//! - [`HttpFileSystem`] for `http://` and `https://`, with an optional
//!   revalidating [`DirCache`] for downloads
//! - [`MemoryFileSystem`] for testing (behind `mock` feature flag)
//! - [`Registry`] mapping protocols to backends
//! - [`open_files`] resolving targets with [`OpenOptions`] (encoding,
//!   compression, storage options)
//!
//! # Example
//!
//! ```no_run
//! use mdsource_storage::{OpenOptions, Registry, open_files};
//!
//! let options = OpenOptions::default();
//! let registry = Registry::new(&options.storage)?;
//! let files = open_files(&["docs/*.md".to_owned()], &options, &registry)?;
//! for file in &files {
//!     let _text = file.read_text()?;
//! }
//! # Ok::<(), mdsource_storage::StorageError>(())
//! ```

mod cache;
mod error;
mod filesystem;
mod fs;
mod http;
#[cfg(feature = "mock")]
mod mock;
mod open_file;
mod options;

pub use cache::{CachedEntry, DirCache, DownloadCache, NoCache, cache_key};
pub use error::{ErrorStatus, StorageError, StorageErrorKind};
pub use filesystem::{FileSystem, Registry, split_protocol};
pub use fs::{LocalFileSystem, has_magic};
pub use http::HttpFileSystem;
#[cfg(feature = "mock")]
pub use mock::MemoryFileSystem;
pub use open_file::{OpenFile, open_files};
pub use options::{Compression, OpenOptions, StorageOptions, TextEncoding};

//! Markdown files as a partitioned data source.
//!
//! [`MarkdownSource`] resolves a set of targets (local paths, glob patterns,
//! or remote URLs) into files once, then reads them on demand:
//! - [`schema`](DataSource::schema) reports one partition per resolved file
//! - [`partition`](DataSource::partition) reads one file into a [`Document`]
//! - [`read`](DataSource::read) concatenates every file into one [`Document`]
//!
//! File access goes through [`mdsource_storage`]; rendering through
//! [`mdsource_render`].
//!
//! # Example
//!
//! ```no_run
//! use mdsource::{DataSource, MarkdownSource};
//!
//! let source = MarkdownSource::new("docs/*.md").with_compression("infer")?;
//! println!("{} files", source.schema()?.npartitions);
//! let html = source.read()?.render_html()?;
//! # Ok::<(), mdsource::SourceError>(())
//! ```

mod error;
mod markdown;
mod reader;
mod schema;
mod source;

pub use error::SourceError;
pub use markdown::{Discovery, MarkdownArgs, MarkdownSource, UrlPath};
pub use reader::read_file;
pub use schema::{Metadata, Schema};
pub use source::DataSource;

pub use mdsource_render::{Document, DocumentOptions, RenderError, RenderOptions};
pub use mdsource_storage::{StorageError, StorageErrorKind, StorageOptions};

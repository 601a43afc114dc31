//! Markdown files as a data source.

use std::sync::OnceLock;

use mdsource_render::{Document, DocumentOptions};
use mdsource_storage::{
    Compression, OpenFile, OpenOptions, Registry, StorageOptions, TextEncoding, open_files,
    split_protocol,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::SourceError;
use crate::reader::read_file;
use crate::schema::{Metadata, Schema};
use crate::source::DataSource;

/// Number of lines of the first partition shown by [`MarkdownSource::discover`].
const HEAD_LINES: usize = 5;

/// One target location or a list of them.
///
/// Each target is a local path, a glob pattern (`docs/*.md`) or a URL with a
/// protocol prefix (`https://...`, `file://...`).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UrlPath {
    /// A single target.
    One(String),
    /// Several targets, resolved in order.
    Many(Vec<String>),
}

impl UrlPath {
    /// Targets in order.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        match self {
            Self::One(target) => vec![target.clone()],
            Self::Many(targets) => targets.clone(),
        }
    }
}

impl From<&str> for UrlPath {
    fn from(target: &str) -> Self {
        Self::One(target.to_owned())
    }
}

impl From<String> for UrlPath {
    fn from(target: String) -> Self {
        Self::One(target)
    }
}

impl From<Vec<String>> for UrlPath {
    fn from(targets: Vec<String>) -> Self {
        Self::Many(targets)
    }
}

impl From<Vec<&str>> for UrlPath {
    fn from(targets: Vec<&str>) -> Self {
        Self::Many(targets.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for UrlPath {
    fn from(targets: [&str; N]) -> Self {
        Self::Many(targets.into_iter().map(str::to_owned).collect())
    }
}

fn default_text_encoding() -> String {
    "utf8".to_owned()
}

/// Serializable construction arguments, as found in catalog entries.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct MarkdownArgs {
    /// Target location(s).
    pub urlpath: UrlPath,
    /// Text encoding label.
    #[serde(default = "default_text_encoding")]
    pub text_encoding: String,
    /// Compression codec name or `"infer"`.
    #[serde(default)]
    pub compression: Option<String>,
    /// Metadata attached to the schema.
    #[serde(default)]
    pub metadata: Metadata,
    /// Options forwarded to every produced [`Document`].
    #[serde(default)]
    pub document: DocumentOptions,
    /// Options forwarded to the storage backend.
    #[serde(default)]
    pub storage_options: StorageOptions,
}

/// Schema plus a short preview, for interactive inspection.
#[derive(Clone, Debug, PartialEq)]
pub struct Discovery {
    /// Source schema.
    pub schema: Schema,
    /// First lines of the first partition; `None` when there are no files.
    pub head: Option<String>,
}

/// Reads markdown files into [`Document`]s.
///
/// Takes a set of files (local or remote, literal or glob) and returns a single
/// `Document` built by concatenating every file's contents. Each file is also
/// a partition that can be read on its own.
///
/// # Example
///
/// ```no_run
/// use mdsource::{DataSource, MarkdownSource};
///
/// let source = MarkdownSource::new(["intro.md", "chapters/*.md.gz"])
///     .with_compression("infer")?;
/// let first = source.partition(0)?;
/// let all = source.read()?;
/// assert!(all.data.starts_with(&first.data));
/// # Ok::<(), mdsource::SourceError>(())
/// ```
#[derive(Debug)]
pub struct MarkdownSource {
    targets: Vec<String>,
    options: OpenOptions,
    metadata: Metadata,
    document_options: DocumentOptions,
    registry: Option<Registry>,
    files: OnceLock<Vec<OpenFile>>,
}

impl MarkdownSource {
    /// Create a source over one or more target locations with default
    /// options: UTF-8, no compression, no metadata.
    #[must_use]
    pub fn new(urlpath: impl Into<UrlPath>) -> Self {
        Self {
            targets: urlpath.into().targets(),
            options: OpenOptions::default(),
            metadata: Metadata::new(),
            document_options: DocumentOptions::default(),
            registry: None,
            files: OnceLock::new(),
        }
    }

    /// Create a source from serialized arguments.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Storage`] for an unknown encoding label or
    /// compression codec.
    pub fn from_args(args: MarkdownArgs) -> Result<Self, SourceError> {
        let mut source = Self::new(args.urlpath)
            .with_text_encoding(&args.text_encoding)?
            .with_metadata(args.metadata)
            .with_document_options(args.document)
            .with_storage_options(args.storage_options);
        if let Some(compression) = &args.compression {
            source = source.with_compression(compression)?;
        }
        Ok(source)
    }

    /// Set the text encoding by label (`utf8`, `latin1`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Storage`] for an unknown label.
    pub fn with_text_encoding(mut self, label: &str) -> Result<Self, SourceError> {
        self.options.encoding = TextEncoding::from_label(label)?;
        Ok(self)
    }

    /// Set the compression codec (`gzip`, `bz2`, `infer`, `none`).
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Storage`] for an unknown codec.
    pub fn with_compression(mut self, codec: &str) -> Result<Self, SourceError> {
        self.options.compression = codec.parse::<Compression>()?;
        Ok(self)
    }

    /// Set schema metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Set options forwarded to produced documents.
    #[must_use]
    pub fn with_document_options(mut self, options: DocumentOptions) -> Self {
        self.document_options = options;
        self
    }

    /// Set backend storage options.
    #[must_use]
    pub fn with_storage_options(mut self, options: StorageOptions) -> Self {
        self.options.storage = options;
        self
    }

    /// Use a custom backend registry instead of the default local + HTTP one.
    #[must_use]
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Target locations in order.
    #[must_use]
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Resolved files, resolving on first use.
    ///
    /// # Errors
    ///
    /// Returns backend errors from target expansion untranslated, and
    /// [`StorageErrorKind::InvalidOption`](mdsource_storage::StorageErrorKind)
    /// for storage options the default backends reject.
    pub fn files(&self) -> Result<&[OpenFile], SourceError> {
        if let Some(files) = self.files.get() {
            return Ok(files);
        }

        let registry = match &self.registry {
            Some(registry) => registry.clone(),
            None => Registry::new(&self.options.storage)?,
        };
        let files = open_files(&self.targets, &self.options, &registry)?;
        info!(
            targets = self.targets.len(),
            files = files.len(),
            "resolved markdown source"
        );
        Ok(self.files.get_or_init(|| files))
    }

    /// Base URL for documents built from `files`.
    ///
    /// Explicit document options win; otherwise a single remote file is its
    /// own base, so relative links resolve next to it.
    fn base_url(&self, files: &[OpenFile]) -> Option<String> {
        if self.document_options.base_url.is_some() {
            return self.document_options.base_url.clone();
        }
        match files {
            [file] if matches!(split_protocol(file.location()).0, "http" | "https") => {
                Some(file.location().to_owned())
            }
            _ => None,
        }
    }

    /// Build a document from file contents with the forwarded options.
    fn document(&self, files: &[OpenFile], file_data: Vec<String>) -> Document {
        let mut doc = Document::new(file_data.concat())
            .with_document_options(&self.document_options)
            .with_file_data(file_data);
        doc.base_url = self.base_url(files);
        doc
    }

    /// Schema plus the first lines of the first partition.
    ///
    /// # Errors
    ///
    /// Returns resolution or read errors.
    pub fn discover(&self) -> Result<Discovery, SourceError> {
        let schema = self.schema()?;
        let head = match self.files()?.first() {
            Some(file) => {
                let text = read_file(file)?;
                Some(text.lines().take(HEAD_LINES).collect::<Vec<_>>().join("\n"))
            }
            None => None,
        };
        Ok(Discovery { schema, head })
    }

    /// Read all files and render the combined document to HTML.
    ///
    /// # Errors
    ///
    /// Returns read errors or [`SourceError::Render`].
    pub fn to_html(&self) -> Result<String, SourceError> {
        Ok(self.read()?.render_html()?)
    }
}

impl DataSource for MarkdownSource {
    type Partition = Document;
    type Output = Document;

    const NAME: &'static str = "markdown";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");
    const CONTAINER: &'static str = "markdown";
    const PARTITION_ACCESS: bool = true;

    fn schema(&self) -> Result<Schema, SourceError> {
        let npartitions = self.files()?.len();
        Ok(Schema::unbounded(npartitions, self.metadata.clone()))
    }

    /// Read only file `index` into its own document.
    ///
    /// The document carries the same forwarded options as [`read`](Self::read),
    /// so a partition renders exactly like a single-file source would.
    fn partition(&self, index: usize) -> Result<Document, SourceError> {
        let files = self.files()?;
        let file = files.get(index).ok_or(SourceError::PartitionOutOfBounds {
            index,
            npartitions: files.len(),
        })?;
        debug!(index, location = file.location(), "reading partition");
        let text = read_file(file)?;
        Ok(self.document(std::slice::from_ref(file), vec![text]))
    }

    /// Read every file in order and concatenate them without separators.
    fn read(&self) -> Result<Document, SourceError> {
        let files = self.files()?;
        let file_data = files.iter().map(read_file).collect::<Result<Vec<_>, _>>()?;
        Ok(self.document(files, file_data))
    }

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn close(&mut self) {
        self.files = OnceLock::new();
    }
}

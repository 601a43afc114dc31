//! TOML catalogs of named markdown sources.
//!
//! A catalog declares sources by name, each with a driver and the arguments
//! used to construct it:
//!
//! ```toml
//! [sources.guide]
//! driver = "markdown"
//! description = "User guide"
//! [sources.guide.args]
//! urlpath = ["docs/intro.md", "docs/chapters/*.md"]
//! compression = "infer"
//! [sources.guide.args.document]
//! base_url = "${DOCS_BASE_URL:-https://example.com/docs/}"
//! ```
//!
//! Environment variables are expanded in `urlpath`, `base_url` and storage
//! option values. Relative local paths resolve against the catalog's
//! directory.

mod expand;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use mdsource::{MarkdownArgs, MarkdownSource, Metadata, SourceError, UrlPath};
use serde::Deserialize;
use tracing::{debug, info};

/// The only driver this catalog can construct.
pub const MARKDOWN_DRIVER: &str = "markdown";

/// Catalog error.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// File not found.
    #[error("Catalog file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Catalog error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Catalog field path (e.g., "`sources.guide.args.urlpath`").
        field: String,
        /// Error message (e.g., "${`DOCS_TOKEN`} not set").
        message: String,
    },
    /// Entry names a driver other than `markdown`.
    #[error("Source {name} uses unknown driver {driver:?}")]
    UnknownDriver {
        /// Entry name.
        name: String,
        /// Declared driver.
        driver: String,
    },
    /// No entry with this name.
    #[error("No source named {0:?} in catalog")]
    UnknownSource(String),
    /// Entry arguments rejected by the source.
    #[error("Source {name}: {source}")]
    Source {
        /// Entry name.
        name: String,
        /// Construction error.
        source: SourceError,
    },
}

/// One named source declaration.
#[derive(Clone, Debug, Deserialize)]
pub struct CatalogEntry {
    /// Driver name; must be `markdown`.
    pub driver: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,
    /// Source construction arguments.
    pub args: MarkdownArgs,
    /// Metadata merged over `args.metadata`.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A set of named sources loaded from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Catalog-level metadata.
    pub metadata: Metadata,
    sources: BTreeMap<String, CatalogEntry>,
    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Catalog {
    /// Load a catalog file.
    ///
    /// Expands environment variables, resolves relative local targets against
    /// the file's directory, then validates every entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for a missing file, and parse,
    /// expansion or validation errors otherwise.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        if !path.exists() {
            return Err(CatalogError::NotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let mut catalog: Self = toml::from_str(&content)?;

        catalog.expand_env_vars()?;

        let catalog_dir = path.parent().unwrap_or(Path::new("."));
        catalog.resolve_paths(catalog_dir);
        catalog.path = Some(path.to_path_buf());

        catalog.validate()?;

        info!(path = %path.display(), sources = catalog.sources.len(), "loaded catalog");
        Ok(catalog)
    }

    /// Path the catalog was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Entry names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    /// Entry by name.
    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.sources.get(name)
    }

    /// Construct the source declared under `name`.
    ///
    /// Entry metadata is merged over the argument metadata, and the entry
    /// description is kept under the `description` key unless already set.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownSource`] or [`CatalogError::Source`] for
    /// arguments the source rejects (unknown encoding or compression).
    pub fn source(&self, name: &str) -> Result<MarkdownSource, CatalogError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| CatalogError::UnknownSource(name.to_owned()))?;

        let mut args = entry.args.clone();
        args.metadata.extend(entry.metadata.clone());
        if let Some(description) = &entry.description {
            args.metadata
                .entry("description".to_owned())
                .or_insert_with(|| description.clone().into());
        }

        debug!(name, "constructing source");
        MarkdownSource::from_args(args).map_err(|source| CatalogError::Source {
            name: name.to_owned(),
            source,
        })
    }

    /// Validate every entry.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownDriver`] for a non-markdown driver and
    /// [`CatalogError::Validation`] for an empty `urlpath`.
    pub fn validate(&self) -> Result<(), CatalogError> {
        for (name, entry) in &self.sources {
            if entry.driver != MARKDOWN_DRIVER {
                return Err(CatalogError::UnknownDriver {
                    name: name.clone(),
                    driver: entry.driver.clone(),
                });
            }
            let targets = entry.args.urlpath.targets();
            if targets.is_empty() || targets.iter().any(String::is_empty) {
                return Err(CatalogError::Validation(format!(
                    "sources.{name}.args.urlpath cannot be empty"
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in entry strings.
    fn expand_env_vars(&mut self) -> Result<(), CatalogError> {
        for (name, entry) in &mut self.sources {
            let args = &mut entry.args;

            let field = format!("sources.{name}.args.urlpath");
            for target in urlpath_targets_mut(&mut args.urlpath) {
                *target = expand::expand_env(target, &field)?;
            }

            if let Some(ref url) = args.document.base_url {
                let field = format!("sources.{name}.args.document.base_url");
                args.document.base_url = Some(expand::expand_env(url, &field)?);
            }

            let storage = &mut args.storage_options;
            for (key, value) in storage.headers.iter_mut().chain(storage.extra.iter_mut()) {
                let field = format!("sources.{name}.args.storage_options.{key}");
                *value = expand::expand_env(value, &field)?;
            }
        }
        Ok(())
    }

    /// Resolve relative local targets against the catalog directory.
    fn resolve_paths(&mut self, catalog_dir: &Path) {
        for entry in self.sources.values_mut() {
            for target in urlpath_targets_mut(&mut entry.args.urlpath) {
                if is_relative_local(target) {
                    *target = catalog_dir.join(&*target).to_string_lossy().into_owned();
                }
            }
        }
    }
}

impl FromStr for Catalog {
    type Err = CatalogError;

    /// Parse a catalog without a backing file.
    ///
    /// Environment variables are expanded; relative targets stay relative to
    /// the working directory.
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut catalog: Self = toml::from_str(content)?;
        catalog.expand_env_vars()?;
        catalog.validate()?;
        Ok(catalog)
    }
}

fn urlpath_targets_mut(urlpath: &mut UrlPath) -> std::slice::IterMut<'_, String> {
    match urlpath {
        UrlPath::One(target) => std::slice::from_mut(target).iter_mut(),
        UrlPath::Many(targets) => targets.iter_mut(),
    }
}

/// A bare path (no protocol, no `~`) that is not absolute.
fn is_relative_local(target: &str) -> bool {
    !target.contains("://") && !target.starts_with('~') && Path::new(target).is_relative()
}

#[cfg(test)]
mod tests {
    use mdsource::DataSource;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    const GUIDE: &str = r#"
[metadata]
version = 1

[sources.guide]
driver = "markdown"
description = "User guide"

[sources.guide.args]
urlpath = ["docs/intro.md", "docs/chapters/*.md"]
text_encoding = "utf8"
compression = "infer"

[sources.guide.args.document]
base_url = "https://example.com/docs/"
extensions = ["fenced_code", "codehilite", "tables"]

[sources.guide.metadata]
owner = "docs"

[sources.notes]
driver = "markdown"
args = { urlpath = "https://example.com/notes.md" }
"#;

    #[test]
    fn test_parse_catalog() {
        let catalog: Catalog = GUIDE.parse().unwrap();

        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["guide", "notes"]);
        assert_eq!(catalog.metadata.get("version"), Some(&json!(1)));
        let guide = catalog.entry("guide").unwrap();
        assert_eq!(guide.description.as_deref(), Some("User guide"));
        assert_eq!(
            guide.args.urlpath,
            UrlPath::Many(vec![
                "docs/intro.md".to_owned(),
                "docs/chapters/*.md".to_owned()
            ])
        );
        assert_eq!(guide.args.compression.as_deref(), Some("infer"));
        assert_eq!(
            guide.args.document.base_url.as_deref(),
            Some("https://example.com/docs/")
        );
        assert!(catalog.path().is_none());
    }

    #[test]
    fn test_source_merges_metadata() {
        let catalog: Catalog = GUIDE.parse().unwrap();

        let source = catalog.source("guide").unwrap();

        assert_eq!(source.targets(), ["docs/intro.md", "docs/chapters/*.md"]);
        assert_eq!(source.metadata().get("owner"), Some(&json!("docs")));
        assert_eq!(
            source.metadata().get("description"),
            Some(&json!("User guide"))
        );
    }

    #[test]
    fn test_unknown_source() {
        let catalog: Catalog = GUIDE.parse().unwrap();

        assert!(matches!(
            catalog.source("missing"),
            Err(CatalogError::UnknownSource(ref name)) if name == "missing"
        ));
    }

    #[test]
    fn test_unknown_driver() {
        let toml = r#"
[sources.table]
driver = "csv"
args = { urlpath = "data.csv" }
"#;
        let err = toml.parse::<Catalog>().unwrap_err();

        assert!(matches!(
            err,
            CatalogError::UnknownDriver { ref name, ref driver } if name == "table" && driver == "csv"
        ));
    }

    #[test]
    fn test_empty_urlpath() {
        let toml = r#"
[sources.empty]
driver = "markdown"
args = { urlpath = [] }
"#;
        let err = toml.parse::<Catalog>().unwrap_err();

        assert!(matches!(err, CatalogError::Validation(_)));
        assert!(err.to_string().contains("sources.empty.args.urlpath"));
    }

    #[test]
    fn test_bad_compression_reported_on_source() {
        let toml = r#"
[sources.odd]
driver = "markdown"
args = { urlpath = "a.md", compression = "lzma" }
"#;
        let catalog: Catalog = toml.parse().unwrap();

        assert!(matches!(
            catalog.source("odd"),
            Err(CatalogError::Source { ref name, .. }) if name == "odd"
        ));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("MDSOURCE_CATALOG_TEST_TOKEN", "s3cret");
            std::env::set_var("MDSOURCE_CATALOG_TEST_HOST", "docs.test");
        }

        let toml = r#"
[sources.remote]
driver = "markdown"

[sources.remote.args]
urlpath = "https://${MDSOURCE_CATALOG_TEST_HOST}/guide.md"

[sources.remote.args.document]
base_url = "https://${MDSOURCE_CATALOG_TEST_HOST}/"

[sources.remote.args.storage_options]
timeout_secs = 5
headers = { Authorization = "Bearer ${MDSOURCE_CATALOG_TEST_TOKEN}" }
"#;
        let catalog: Catalog = toml.parse().unwrap();
        let args = &catalog.entry("remote").unwrap().args;

        assert_eq!(
            args.urlpath,
            UrlPath::One("https://docs.test/guide.md".to_owned())
        );
        assert_eq!(args.document.base_url.as_deref(), Some("https://docs.test/"));
        assert_eq!(
            args.storage_options.headers.get("Authorization").map(String::as_str),
            Some("Bearer s3cret")
        );
        assert_eq!(args.storage_options.timeout_secs, Some(5));

        unsafe {
            std::env::remove_var("MDSOURCE_CATALOG_TEST_TOKEN");
            std::env::remove_var("MDSOURCE_CATALOG_TEST_HOST");
        }
    }

    #[test]
    fn test_expand_env_vars_missing() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("MDSOURCE_CATALOG_TEST_MISSING");
        }

        let toml = r#"
[sources.remote]
driver = "markdown"
args = { urlpath = "${MDSOURCE_CATALOG_TEST_MISSING}/a.md" }
"#;
        let err = toml.parse::<Catalog>().unwrap_err();

        assert!(matches!(err, CatalogError::EnvVar { .. }));
        assert!(err.to_string().contains("MDSOURCE_CATALOG_TEST_MISSING"));
        assert!(err.to_string().contains("sources.remote.args.urlpath"));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.toml");

        assert!(matches!(
            Catalog::load(&path),
            Err(CatalogError::NotFound(ref p)) if *p == path
        ));
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.md"), "# A\n").unwrap();
        std::fs::write(docs.join("b.md"), "b").unwrap();
        let path = tmp.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[sources.local]
driver = "markdown"
args = { urlpath = ["docs/*.md", "https://example.com/c.md", "/abs/d.md"] }
"#,
        )
        .unwrap();

        let catalog = Catalog::load(&path).unwrap();
        let targets = catalog.entry("local").unwrap().args.urlpath.targets();

        assert_eq!(
            targets,
            vec![
                docs.join("*.md").to_string_lossy().into_owned(),
                "https://example.com/c.md".to_owned(),
                "/abs/d.md".to_owned(),
            ]
        );
        assert_eq!(catalog.path(), Some(path.as_path()));
    }

    #[test]
    fn test_loaded_source_reads_files() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("docs");
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("a.md"), "# A\n").unwrap();
        std::fs::write(docs.join("b.md"), "b").unwrap();
        let path = tmp.path().join("catalog.toml");
        std::fs::write(
            &path,
            r#"
[sources.local]
driver = "markdown"
args = { urlpath = "docs/*.md" }
"#,
        )
        .unwrap();

        let source = Catalog::load(&path).unwrap().source("local").unwrap();

        assert_eq!(source.npartitions().unwrap(), 2);
        assert_eq!(source.read().unwrap().data, "# A\nb");
    }
}

//! The markdown document value object.

use serde::Deserialize;

use crate::error::RenderError;
use crate::highlight::stylesheet;
use crate::links::post_process;
use crate::options::{Extension, RenderOptions};
use crate::renderer::render_markdown;
use crate::util::escape_html;

/// Construction options for a [`Document`], as forwarded by a data source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DocumentOptions {
    /// Text placed before the content.
    pub pre: Option<String>,
    /// Text placed after the content.
    pub post: Option<String>,
    /// Base URL for resolving relative links and images.
    pub base_url: Option<String>,
    /// Extensions, highlighter settings and extra CSS.
    #[serde(flatten)]
    pub render: RenderOptions,
}

/// Markdown text that renders to a styled HTML fragment.
///
/// Rendering is a pure function of the fields; [`render_html`](Self::render_html)
/// never mutates the document.
///
/// # Example
///
/// ```
/// use mdsource_render::Document;
///
/// let doc = Document::new("![x](img.png)").with_base_url("https://example.com/docs/");
/// let html = doc.render_html().unwrap();
/// assert!(html.starts_with("<style>"));
/// assert!(html.contains(r#"src="https://example.com/docs/img.png""#));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Raw markdown content.
    pub data: String,
    /// Text placed before `data` when composing.
    pub pre: String,
    /// Text placed after `data` when composing.
    pub post: String,
    /// Base URL for link resolution. Ignored when empty.
    pub base_url: Option<String>,
    /// Render configuration.
    pub options: RenderOptions,
    /// Per-file contents `data` was concatenated from, in order.
    pub file_data: Vec<String>,
}

impl Document {
    /// Create a document with default options.
    #[must_use]
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    /// Set the prefix fragment.
    #[must_use]
    pub fn with_pre(mut self, pre: impl Into<String>) -> Self {
        self.pre = pre.into();
        self
    }

    /// Set the suffix fragment.
    #[must_use]
    pub fn with_post(mut self, post: impl Into<String>) -> Self {
        self.post = post.into();
        self
    }

    /// Set the base URL for link resolution.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set render options.
    #[must_use]
    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    /// Record the per-file contents the document was built from.
    #[must_use]
    pub fn with_file_data(mut self, file_data: Vec<String>) -> Self {
        self.file_data = file_data;
        self
    }

    /// Apply forwarded construction options. Unset fields keep their values.
    #[must_use]
    pub fn with_document_options(mut self, options: &DocumentOptions) -> Self {
        if let Some(pre) = &options.pre {
            self.pre.clone_from(pre);
        }
        if let Some(post) = &options.post {
            self.post.clone_from(post);
        }
        if options.base_url.is_some() {
            self.base_url.clone_from(&options.base_url);
        }
        self.options = options.render.clone();
        self
    }

    /// `pre + data + post`.
    #[must_use]
    pub fn composed_text(&self) -> String {
        let mut text = String::with_capacity(self.pre.len() + self.data.len() + self.post.len());
        text.push_str(&self.pre);
        text.push_str(&self.data);
        text.push_str(&self.post);
        text
    }

    /// The `<style>` block: highlighter rules followed by extra CSS.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownTheme`] for an unknown highlighter theme.
    pub fn style_block(&self) -> Result<String, RenderError> {
        let mut css = String::new();
        if self.options.is_enabled(Extension::CodeHilite) {
            css.push_str(&stylesheet(&self.options.codehilite)?);
        }
        if let Some(extra) = &self.options.css {
            if !css.is_empty() && !css.ends_with('\n') {
                css.push('\n');
            }
            css.push_str(extra);
        }
        Ok(format!("<style>{css}</style>"))
    }

    /// Render the composed text to a style block followed by HTML.
    ///
    /// Relative `img[src]` and `a[href]` are resolved against
    /// [`base_url`](Self::base_url) when it is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] for highlighter or rewriter failures and unknown
    /// themes. Malformed markdown is not an error.
    pub fn render_html(&self) -> Result<String, RenderError> {
        let style = self.style_block()?;
        let body = render_markdown(&self.composed_text(), &self.options)?;
        let body = post_process(
            &body,
            self.base_url.as_deref(),
            self.options.is_enabled(Extension::MdInHtml),
        )?;
        tracing::debug!(bytes = body.len(), "rendered document");
        Ok(style + &body)
    }

    /// Rich-output payload for the evcxr Jupyter kernel.
    ///
    /// Render errors become an escaped `<pre>` message instead of failing.
    #[must_use]
    pub fn evcxr_html(&self) -> String {
        let html = self.render_html().unwrap_or_else(|err| {
            format!("<pre>render error: {}</pre>", escape_html(&err.to_string()))
        });
        format!("EVCXR_BEGIN_CONTENT text/html\n{html}\nEVCXR_END_CONTENT")
    }

    /// Display hook for the evcxr Jupyter kernel; prints [`Self::evcxr_html`].
    #[allow(clippy::print_stdout)]
    pub fn evcxr_display(&self) {
        println!("{}", self.evcxr_html());
    }
}

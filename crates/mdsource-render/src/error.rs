//! Render error types.

/// Error raised while configuring or rendering a document.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// Extension name not recognized.
    #[error("unknown markdown extension: {0}")]
    UnknownExtension(String),

    /// Highlighting theme not bundled with the highlighter.
    #[error("unknown highlighting theme: {0}")]
    UnknownTheme(String),

    /// Syntax highlighter failure.
    #[error("syntax highlighting failed")]
    Highlight(#[from] syntect::Error),

    /// HTML post-processing failure.
    #[error("HTML rewriting failed")]
    Rewrite(#[from] lol_html::errors::RewritingError),
}

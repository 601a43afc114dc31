//! Markdown documents that render to styled HTML.
//!
//! This crate provides [`Document`], a value object wrapping markdown text
//! (plus optional prefix/suffix fragments and a base URL) whose
//! [`render_html`](Document::render_html) produces a `<style>` block followed
//! by the converted HTML, ready for notebook display.
//!
//! # Architecture
//!
//! Rendering runs in three stages:
//! - markdown conversion with pulldown-cmark, extensions chosen by
//!   [`RenderOptions`]
//! - syntax highlighting of code blocks with syntect, with a generated
//!   stylesheet for the configured theme
//! - HTML post-processing with lol_html, resolving relative links and images
//!   against the base URL via [`join_url`]
//!
//! # Example
//!
//! ```
//! use mdsource_render::{Document, RenderOptions};
//!
//! let options = RenderOptions::with_extension_names(["fenced_code", "codehilite", "tables"])?;
//! let doc = Document::new("# Hello\n\n```rust\nfn main() {}\n```").with_options(options);
//! let html = doc.render_html()?;
//! assert!(html.contains("<h1>Hello</h1>"));
//! # Ok::<(), mdsource_render::RenderError>(())
//! ```

mod document;
mod error;
mod highlight;
mod links;
mod options;
mod renderer;
mod util;

pub use document::{Document, DocumentOptions};
pub use error::RenderError;
pub use highlight::theme_names;
pub use links::join_url;
pub use options::{CodeHiliteConfig, DEFAULT_EXTENSIONS, Extension, RenderOptions};
pub use util::escape_html;

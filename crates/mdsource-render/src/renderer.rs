//! Markdown to HTML conversion.
//!
//! Parses with pulldown-cmark and serializes with its HTML writer. Code blocks
//! are intercepted on the way through: with highlighting enabled they are
//! replaced by pre-rendered highlighted HTML; without it they pass through,
//! minus their language when fenced languages are disabled.

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Parser, Tag, TagEnd, html};

use crate::error::RenderError;
use crate::highlight::highlight_block;
use crate::options::{Extension, RenderOptions};

/// Code block being collected.
#[derive(Default)]
struct CodeBlockState {
    lang: Option<String>,
    source: String,
}

/// Converts markdown text to an HTML fragment.
pub(crate) struct HtmlRenderer<'a> {
    options: &'a RenderOptions,
    highlight: bool,
    fenced: bool,
    code: Option<CodeBlockState>,
}

impl<'a> HtmlRenderer<'a> {
    pub(crate) fn new(options: &'a RenderOptions) -> Self {
        Self {
            options,
            highlight: options.is_enabled(Extension::CodeHilite),
            fenced: options.is_enabled(Extension::FencedCode),
            code: None,
        }
    }

    /// Render markdown text. Malformed markdown never fails; the parser
    /// degrades to literal text.
    pub(crate) fn render(mut self, markdown: &str) -> Result<String, RenderError> {
        let parser = Parser::new_ext(markdown, self.options.parser_options());

        let mut events = Vec::new();
        for event in parser {
            if let Some(event) = self.process_event(event)? {
                events.push(event);
            }
        }

        let mut out = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut out, events.into_iter());
        Ok(out)
    }

    fn process_event<'e>(&mut self, event: Event<'e>) -> Result<Option<Event<'e>>, RenderError> {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = self.language(&kind);
                if self.highlight {
                    self.code = Some(CodeBlockState {
                        lang,
                        source: String::new(),
                    });
                    return Ok(None);
                }
                let kind = match (kind, lang) {
                    (CodeBlockKind::Fenced(_), lang) => {
                        CodeBlockKind::Fenced(CowStr::from(lang.unwrap_or_default()))
                    }
                    (indented, _) => indented,
                };
                Ok(Some(Event::Start(Tag::CodeBlock(kind))))
            }
            Event::Text(text) if self.code.is_some() => {
                if let Some(code) = self.code.as_mut() {
                    code.source.push_str(&text);
                }
                Ok(None)
            }
            Event::End(TagEnd::CodeBlock) if self.code.is_some() => {
                let code = self.code.take().unwrap_or_default();
                let html = highlight_block(
                    &code.source,
                    code.lang.as_deref(),
                    &self.options.codehilite,
                )?;
                Ok(Some(Event::Html(CowStr::from(html))))
            }
            other => Ok(Some(other)),
        }
    }

    /// Language for a code block: the first word of a fence's info string,
    /// only when fenced languages are enabled.
    fn language(&self, kind: &CodeBlockKind<'_>) -> Option<String> {
        match kind {
            CodeBlockKind::Fenced(info) if self.fenced => info
                .split_whitespace()
                .next()
                .map(|lang| lang.trim_matches(['{', '}', '.']).to_owned())
                .filter(|lang| !lang.is_empty()),
            _ => None,
        }
    }
}

/// Render markdown with the given options.
pub(crate) fn render_markdown(markdown: &str, options: &RenderOptions) -> Result<String, RenderError> {
    HtmlRenderer::new(options).render(markdown)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn render(markdown: &str, extensions: &[&str]) -> String {
        let options = RenderOptions::with_extension_names(extensions).unwrap();
        render_markdown(markdown, &options).unwrap()
    }

    #[test]
    fn test_plain_paragraph() {
        assert_eq!(render("hello", &[]), "<p>hello</p>\n");
    }

    #[test]
    fn test_heading_and_emphasis() {
        let html = render("# Title\n\n**bold** text", &[]);

        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_fenced_code_without_highlighting() {
        let html = render("```rust\nfn main() {}\n```", &["fenced_code"]);

        assert_eq!(
            html,
            "<pre><code class=\"language-rust\">fn main() {}\n</code></pre>\n"
        );
    }

    #[test]
    fn test_fenced_language_dropped_when_disabled() {
        let html = render("```rust\nfn main() {}\n```", &[]);

        assert_eq!(html, "<pre><code>fn main() {}\n</code></pre>\n");
    }

    #[test]
    fn test_fenced_code_highlighted() {
        let html = render("```rust\nfn main() {}\n```", &["fenced_code", "codehilite"]);

        assert!(html.starts_with(r#"<div class="highlight"><pre><code class="language-rust">"#));
        assert!(html.contains("hl-"));
    }

    #[test]
    fn test_indented_code_highlighted_as_plain_text() {
        let html = render("    let x = 1;\n", &["codehilite"]);

        assert!(html.starts_with(r#"<div class="highlight"><pre><code>"#));
        assert!(html.contains("let x = 1;"));
    }

    #[test]
    fn test_tables_extension() {
        let markdown = "| a | b |\n|---|---|\n| 1 | 2 |\n";

        assert!(render(markdown, &["tables"]).contains("<table>"));
        assert!(!render(markdown, &[]).contains("<table>"));
    }

    #[test]
    fn test_raw_html_block_with_markdown_inside() {
        let html = render("<div markdown=\"1\">\n\n*inside*\n\n</div>\n", &["md_in_html"]);

        assert!(html.contains("<em>inside</em>"));
    }

    #[test]
    fn test_unclosed_markup_degrades() {
        let html = render("**not closed\n\n```\nopen fence", &["fenced_code"]);

        assert!(html.contains("**not closed"));
        assert!(html.contains("open fence"));
    }
}

//! Class-based syntax highlighting with syntect.
//!
//! Code blocks are emitted with prefixed CSS classes and the stylesheet for the
//! configured theme is generated separately, so one `<style>` block serves
//! every highlighted block in a document.

use std::sync::LazyLock;

use syntect::highlighting::ThemeSet;
use syntect::html::{ClassStyle, ClassedHTMLGenerator, css_for_theme_with_class_style};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

use crate::error::RenderError;
use crate::options::CodeHiliteConfig;
use crate::util::escape_html;

static SYNTAXES: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEMES: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Prefix keeps highlighter classes from colliding with notebook styles.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hl-" };

/// Names of the bundled themes.
pub fn theme_names() -> impl Iterator<Item = &'static str> {
    THEMES.themes.keys().map(String::as_str)
}

/// CSS rules for the configured theme.
pub(crate) fn stylesheet(config: &CodeHiliteConfig) -> Result<String, RenderError> {
    let theme = THEMES
        .themes
        .get(&config.theme)
        .ok_or_else(|| RenderError::UnknownTheme(config.theme.clone()))?;
    Ok(css_for_theme_with_class_style(theme, CLASS_STYLE)?)
}

/// Pick a syntax from the fence language, falling back to first-line
/// detection when enabled, then plain text.
fn find_syntax(code: &str, lang: Option<&str>, guess: bool) -> &'static SyntaxReference {
    let syntaxes: &'static SyntaxSet = &SYNTAXES;
    lang.and_then(|token| syntaxes.find_syntax_by_token(token))
        .or_else(|| {
            if guess {
                syntaxes.find_syntax_by_first_line(code)
            } else {
                None
            }
        })
        .unwrap_or_else(|| syntaxes.find_syntax_plain_text())
}

/// Highlight one code block into a wrapped `<pre><code>` element.
pub(crate) fn highlight_block(
    code: &str,
    lang: Option<&str>,
    config: &CodeHiliteConfig,
) -> Result<String, RenderError> {
    let syntax = find_syntax(code, lang, config.guess_lang);
    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAXES, CLASS_STYLE);
    for line in LinesWithEndings::from(code) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    let body = generator.finalize();

    let lang_class = lang
        .map(|lang| format!(r#" class="language-{}""#, escape_html(lang)))
        .unwrap_or_default();
    let mut out = format!(
        r#"<div class="{}"><pre><code{lang_class}>"#,
        escape_html(&config.css_class)
    );
    out.push_str(&body);
    out.push_str("</code></pre></div>\n");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stylesheet_default_theme() {
        let css = stylesheet(&CodeHiliteConfig::default()).unwrap();

        assert!(!css.is_empty());
        assert!(css.contains(".hl-"));
    }

    #[test]
    fn test_stylesheet_unknown_theme() {
        let config = CodeHiliteConfig {
            theme: "no-such-theme".to_owned(),
            ..CodeHiliteConfig::default()
        };

        let err = stylesheet(&config).unwrap_err();

        assert!(matches!(err, RenderError::UnknownTheme(name) if name == "no-such-theme"));
    }

    #[test]
    fn test_highlight_rust_block() {
        let html =
            highlight_block("fn main() {}\n", Some("rust"), &CodeHiliteConfig::default()).unwrap();

        assert!(html.starts_with(r#"<div class="highlight"><pre><code class="language-rust">"#));
        assert!(html.contains("hl-"));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_highlight_unknown_language_escapes() {
        let html =
            highlight_block("<b>&</b>\n", Some("nosuchlang"), &CodeHiliteConfig::default())
                .unwrap();

        assert!(html.contains("&lt;b&gt;&amp;&lt;/b&gt;"));
    }

    #[test]
    fn test_guess_language_from_shebang() {
        let config = CodeHiliteConfig {
            guess_lang: true,
            ..CodeHiliteConfig::default()
        };

        let syntax = find_syntax("#!/usr/bin/env python\nprint(1)\n", None, config.guess_lang);

        assert_eq!(syntax.name, "Python");
    }

    #[test]
    fn test_bundled_themes() {
        assert!(theme_names().any(|name| name == "InspiredGitHub"));
    }
}

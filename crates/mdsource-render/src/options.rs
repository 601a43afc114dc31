//! Typed render configuration.
//!
//! Markdown extensions and highlighter settings are explicit types rather than
//! free-form maps. Extension names use the familiar Python-Markdown spelling
//! (`fenced_code`, `codehilite`, ...) so existing catalog entries keep working.

use std::fmt;
use std::str::FromStr;

use pulldown_cmark::Options;
use serde::Deserialize;

use crate::error::RenderError;

/// A markdown extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Extension {
    /// Fenced code blocks select the highlighter language from their info
    /// string. When disabled, info strings are ignored.
    FencedCode,
    /// Syntax highlighting of code blocks plus the matching stylesheet.
    CodeHilite,
    /// Markdown inside raw HTML blocks; strips the `markdown` attribute from
    /// output.
    MdInHtml,
    /// GFM tables.
    Tables,
    /// Footnotes (`[^1]`).
    Footnotes,
    /// `~~strikethrough~~`.
    Strikethrough,
    /// Task list items (`- [x]`).
    TaskList,
    /// Definition lists.
    DefList,
    /// Smart quotes and dashes.
    Smarty,
    /// `{#id .class}` heading attributes.
    AttrList,
}

impl Extension {
    /// Every recognized extension.
    pub const ALL: [Self; 10] = [
        Self::FencedCode,
        Self::CodeHilite,
        Self::MdInHtml,
        Self::Tables,
        Self::Footnotes,
        Self::Strikethrough,
        Self::TaskList,
        Self::DefList,
        Self::Smarty,
        Self::AttrList,
    ];

    /// Canonical extension name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FencedCode => "fenced_code",
            Self::CodeHilite => "codehilite",
            Self::MdInHtml => "md_in_html",
            Self::Tables => "tables",
            Self::Footnotes => "footnotes",
            Self::Strikethrough => "strikethrough",
            Self::TaskList => "tasklist",
            Self::DefList => "def_list",
            Self::Smarty => "smarty",
            Self::AttrList => "attr_list",
        }
    }

    /// Parser flag enabled by this extension, if any.
    const fn parser_option(self) -> Options {
        match self {
            Self::Tables => Options::ENABLE_TABLES,
            Self::Footnotes => Options::ENABLE_FOOTNOTES,
            Self::Strikethrough => Options::ENABLE_STRIKETHROUGH,
            Self::TaskList => Options::ENABLE_TASKLISTS,
            Self::DefList => Options::ENABLE_DEFINITION_LIST,
            Self::Smarty => Options::ENABLE_SMART_PUNCTUATION,
            Self::AttrList => Options::ENABLE_HEADING_ATTRIBUTES,
            Self::FencedCode | Self::CodeHilite | Self::MdInHtml => Options::empty(),
        }
    }
}

impl FromStr for Extension {
    type Err = RenderError;

    /// Parse an extension name. The `markdown.extensions.` module prefix is
    /// accepted and ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let name = name.strip_prefix("markdown.extensions.").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|ext| ext.name() == name)
            .ok_or_else(|| RenderError::UnknownExtension(s.to_owned()))
    }
}

impl TryFrom<String> for Extension {
    type Error = RenderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default extension set.
pub const DEFAULT_EXTENSIONS: [Extension; 3] = [
    Extension::FencedCode,
    Extension::CodeHilite,
    Extension::MdInHtml,
];

/// Syntax highlighter settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CodeHiliteConfig {
    /// Class of the `<div>` wrapping each highlighted block.
    pub css_class: String,
    /// Named color scheme for the generated stylesheet.
    pub theme: String,
    /// Detect the language from the first line when a block has none.
    pub guess_lang: bool,
}

impl Default for CodeHiliteConfig {
    fn default() -> Self {
        Self {
            css_class: "highlight".to_owned(),
            theme: "InspiredGitHub".to_owned(),
            guess_lang: false,
        }
    }
}

/// Everything that controls markdown conversion and styling.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Enabled extensions.
    pub extensions: Vec<Extension>,
    /// Highlighter settings, used when [`Extension::CodeHilite`] is enabled.
    pub codehilite: CodeHiliteConfig,
    /// Extra CSS appended to the generated stylesheet.
    pub css: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.to_vec(),
            codehilite: CodeHiliteConfig::default(),
            css: None,
        }
    }
}

impl RenderOptions {
    /// Parse extension names into options with default highlighter settings.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::UnknownExtension`] for unrecognized names.
    pub fn with_extension_names<I, S>(names: I) -> Result<Self, RenderError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = names
            .into_iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<_, _>>()?;
        Ok(Self {
            extensions,
            ..Self::default()
        })
    }

    /// Whether an extension is enabled.
    #[must_use]
    pub fn is_enabled(&self, extension: Extension) -> bool {
        self.extensions.contains(&extension)
    }

    /// Parser options for the enabled extensions.
    #[must_use]
    pub fn parser_options(&self) -> Options {
        self.extensions
            .iter()
            .fold(Options::empty(), |acc, ext| acc | ext.parser_option())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_extension_from_str() {
        assert_eq!("fenced_code".parse::<Extension>().unwrap(), Extension::FencedCode);
        assert_eq!(
            "markdown.extensions.codehilite".parse::<Extension>().unwrap(),
            Extension::CodeHilite
        );
    }

    #[test]
    fn test_unknown_extension_is_config_error() {
        let err = "wikilinks".parse::<Extension>().unwrap_err();

        assert!(matches!(err, RenderError::UnknownExtension(name) if name == "wikilinks"));
    }

    #[test]
    fn test_default_extensions() {
        let options = RenderOptions::default();

        assert!(options.is_enabled(Extension::FencedCode));
        assert!(options.is_enabled(Extension::CodeHilite));
        assert!(options.is_enabled(Extension::MdInHtml));
        assert!(!options.is_enabled(Extension::Tables));
        assert_eq!(options.codehilite.css_class, "highlight");
    }

    #[test]
    fn test_parser_options() {
        let options = RenderOptions::with_extension_names(["tables", "footnotes"]).unwrap();

        assert_eq!(
            options.parser_options(),
            Options::ENABLE_TABLES | Options::ENABLE_FOOTNOTES
        );
        assert_eq!(RenderOptions::default().parser_options(), Options::empty());
    }

    #[test]
    fn test_deserialize_render_options() {
        let options: RenderOptions = serde_json::from_str(
            r#"{"extensions": ["fenced_code", "tables"], "codehilite": {"theme": "base16-ocean.dark"}}"#,
        )
        .unwrap();

        assert_eq!(
            options.extensions,
            vec![Extension::FencedCode, Extension::Tables]
        );
        assert_eq!(options.codehilite.theme, "base16-ocean.dark");
        assert_eq!(options.codehilite.css_class, "highlight");
    }

    #[test]
    fn test_deserialize_unknown_extension_fails() {
        let result = serde_json::from_str::<RenderOptions>(r#"{"extensions": ["nope"]}"#);

        assert!(result.is_err());
    }
}

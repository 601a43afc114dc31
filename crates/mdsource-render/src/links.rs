//! Post-processing of rendered HTML.
//!
//! Resolves `img[src]` and `a[href]` against a base URL and strips the
//! `markdown` attribute left on raw HTML blocks. The HTML is rewritten with a
//! streaming [`lol_html`] rewriter, so links inside raw HTML blocks are
//! handled the same as links produced from markdown syntax.

use lol_html::{RewriteStrSettings, element, rewrite_str};
use url::Url;

use crate::error::RenderError;

/// Resolve `reference` against `base` with standard URL-join rules.
///
/// - References that are already absolute URLs are returned unchanged.
/// - An absolute `base` is joined with [`Url::join`] (RFC 3986).
/// - Any other `base` is treated as a path and joined segment-wise.
///
/// # Examples
///
/// ```
/// use mdsource_render::join_url;
///
/// assert_eq!(join_url("https://example.com/docs/", "img.png"), "https://example.com/docs/img.png");
/// assert_eq!(join_url("https://example.com/docs/", "https://other.com/x"), "https://other.com/x");
/// assert_eq!(join_url("docs/guide/", "../img.png"), "docs/img.png");
/// ```
#[must_use]
pub fn join_url(base: &str, reference: &str) -> String {
    if Url::parse(reference).is_ok() {
        return reference.to_owned();
    }
    match Url::parse(base) {
        Ok(base_url) => base_url
            .join(reference)
            .map_or_else(|_| reference.to_owned(), String::from),
        Err(_) => join_path(base, reference),
    }
}

/// Join a reference onto a base that is not an absolute URL.
fn join_path(base: &str, reference: &str) -> String {
    if reference.is_empty() {
        return base.to_owned();
    }
    if reference.starts_with('/') {
        return reference.to_owned();
    }

    let base_no_fragment = base.split('#').next().unwrap_or(base);
    if reference.starts_with('#') {
        return format!("{base_no_fragment}{reference}");
    }
    let base_path = base_no_fragment.split('?').next().unwrap_or(base_no_fragment);
    if reference.starts_with('?') {
        return format!("{base_path}{reference}");
    }

    // The last base segment is the current document; its directory is the base.
    let dir = base_path.rfind('/').map_or("", |i| &base_path[..=i]);
    let (ref_path, suffix) = match reference.find(['?', '#']) {
        Some(i) => reference.split_at(i),
        None => (reference, ""),
    };
    let rooted = dir.starts_with('/');
    let trailing = ref_path.ends_with('/') || ref_path.ends_with("/.") || ref_path.ends_with("/..")
        || ref_path == "."
        || ref_path == "..";

    let mut segments: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for component in ref_path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            _ => segments.push(component),
        }
    }

    let mut joined = segments.join("/");
    if rooted {
        joined.insert(0, '/');
    }
    if trailing && !segments.is_empty() {
        joined.push('/');
    }
    joined.push_str(suffix);
    joined
}

/// Rewrite rendered HTML.
///
/// Link resolution runs only when `base_url` is a non-empty string. Returns the
/// input untouched when there is nothing to do.
pub(crate) fn post_process(
    html: &str,
    base_url: Option<&str>,
    strip_markdown_attr: bool,
) -> Result<String, RenderError> {
    let base_url = base_url.filter(|base| !base.is_empty());
    if base_url.is_none() && !strip_markdown_attr {
        return Ok(html.to_owned());
    }

    let mut element_content_handlers = Vec::new();
    if let Some(base) = base_url {
        element_content_handlers.push(element!("img[src]", move |el| {
            if let Some(src) = el.get_attribute("src") {
                el.set_attribute("src", &join_url(base, &src))?;
            }
            Ok(())
        }));
        element_content_handlers.push(element!("a[href]", move |el| {
            if let Some(href) = el.get_attribute("href") {
                el.set_attribute("href", &join_url(base, &href))?;
            }
            Ok(())
        }));
    }
    if strip_markdown_attr {
        element_content_handlers.push(element!("[markdown]", |el| {
            el.remove_attribute("markdown");
            Ok(())
        }));
    }

    Ok(rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers,
            ..RewriteStrSettings::new()
        },
    )?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_join_url_relative() {
        assert_eq!(
            join_url("https://example.com/docs/", "img.png"),
            "https://example.com/docs/img.png"
        );
        assert_eq!(
            join_url("https://example.com/docs/index.md", "img.png"),
            "https://example.com/docs/img.png"
        );
        assert_eq!(
            join_url("https://example.com/docs/", "../img.png"),
            "https://example.com/img.png"
        );
        assert_eq!(
            join_url("https://example.com/docs/", "/root.png"),
            "https://example.com/root.png"
        );
    }

    #[test]
    fn test_join_url_keeps_absolute_and_schemes() {
        assert_eq!(
            join_url("https://example.com/docs/", "https://other.com"),
            "https://other.com"
        );
        assert_eq!(
            join_url("https://example.com/docs/", "mailto:a@b.c"),
            "mailto:a@b.c"
        );
    }

    #[test]
    fn test_join_url_fragment_and_query() {
        assert_eq!(
            join_url("https://example.com/docs/page.html", "#intro"),
            "https://example.com/docs/page.html#intro"
        );
        assert_eq!(
            join_url("https://example.com/docs/page.html?a=1", "?b=2"),
            "https://example.com/docs/page.html?b=2"
        );
    }

    #[test]
    fn test_join_path_fallback() {
        assert_eq!(join_url("docs/", "img.png"), "docs/img.png");
        assert_eq!(join_url("docs/guide.md", "img.png"), "docs/img.png");
        assert_eq!(join_url("/srv/docs/", "./a/b.png"), "/srv/docs/a/b.png");
        assert_eq!(join_url("docs/", "/abs.png"), "/abs.png");
        assert_eq!(join_url("docs/page.md", "#top"), "docs/page.md#top");
        assert_eq!(join_url("docs/page.md", ""), "docs/page.md");
        assert_eq!(join_url("docs/a/", "sub/?x=1"), "docs/a/sub/?x=1");
    }

    #[test]
    fn test_post_process_rewrites_links_and_images() {
        let html = r#"<p><img src="img.png" alt="x"><a href="page.html">p</a><a href="https://other.com/x">o</a></p>"#;

        let out = post_process(html, Some("https://example.com/docs/"), false).unwrap();

        assert_eq!(
            out,
            r#"<p><img src="https://example.com/docs/img.png" alt="x"><a href="https://example.com/docs/page.html">p</a><a href="https://other.com/x">o</a></p>"#
        );
    }

    #[test]
    fn test_post_process_empty_base_is_noop() {
        let html = r#"<img src="img.png">"#;

        assert_eq!(post_process(html, Some(""), false).unwrap(), html);
        assert_eq!(post_process(html, None, false).unwrap(), html);
    }

    #[test]
    fn test_post_process_strips_markdown_attr() {
        let html = r#"<div markdown="1" class="note"><p>x</p></div>"#;

        let out = post_process(html, None, true).unwrap();

        assert_eq!(out, r#"<div class="note"><p>x</p></div>"#);
    }

    #[test]
    fn test_post_process_anchor_without_href_untouched() {
        let html = r#"<a name="top"></a>"#;

        let out = post_process(html, Some("https://example.com/"), false).unwrap();

        assert_eq!(out, html);
    }
}

//! Readable-content extraction: titles, article bodies, and text cleaning.
//!
//! Converts noisy HTML pages into a title plus a markdown body using a
//! readability heuristic, the `htmd` converter, and a series of cleanup passes.

mod cleanup;
mod readability;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, instrument};
use url::Url;

use contentmill_shared::{ContentMillError, Result, UNTITLED};

/// Title candidates, tried in order; the first element per selector is used.
const TITLE_SELECTORS: &[&str] = &[
    "h1",
    "title",
    r#"[class*="title"]"#,
    r#"[class*="heading"]"#,
    "h2",
    "h3",
];

/// Tags dropped entirely by the markdown converter.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "iframe", "noscript", "svg", "form", "button",
];

// ---------------------------------------------------------------------------
// Text cleaning
// ---------------------------------------------------------------------------

/// Normalize a short text fragment (titles, labels).
///
/// Removes every character outside word characters, whitespace, and
/// `- . , ! ? ; : ( ) [ ] { } " '`, then collapses whitespace runs to a single
/// space and trims.
pub fn clean_text(text: &str) -> String {
    static UNSAFE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"[^\w\s\-.,!?;:()\[\]{}"']"#).expect("valid regex")
    });
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    let allowed = UNSAFE_RE.replace_all(text, "");
    WS_RE.replace_all(&allowed, " ").trim().to_string()
}

// ---------------------------------------------------------------------------
// Titles
// ---------------------------------------------------------------------------

/// Pick a title for a page.
///
/// Falls back to the URL's last path segment, and finally to `"Untitled"`.
pub fn extract_title(doc: &Html, url: &str) -> String {
    for sel_str in TITLE_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        let Some(el) = doc.select(&sel).next() else {
            continue;
        };
        let title = clean_text(&el.text().collect::<String>());
        if !title.is_empty() {
            return title;
        }
    }

    title_from_url(url).unwrap_or_else(|| UNTITLED.to_string())
}

/// Derive a title from a URL slug: `/my-great-post` → `My Great Post`.
pub fn title_from_url(url: &str) -> Option<String> {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let slug = path.split('/').rev().find(|s| !s.is_empty())?;
    let slug = slug
        .trim_end_matches(".html")
        .trim_end_matches(".htm");

    let title = slug
        .replace('-', " ")
        .split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ");

    if title.is_empty() { None } else { Some(title) }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Bodies
// ---------------------------------------------------------------------------

/// Extract the article body of a page as markdown.
///
/// Never fails: an empty string means nothing readable was found, which
/// callers treat as a signal to retry with a rendered page.
pub fn extract_body(html: &str) -> String {
    extract_body_with_base(html, None)
}

/// Like [`extract_body`], resolving relative links against `base_url`.
#[instrument(skip_all, fields(base = base_url.map(Url::as_str).unwrap_or_default()))]
pub fn extract_body_with_base(html: &str, base_url: Option<&Url>) -> String {
    match try_extract_body(html, base_url) {
        Ok(markdown) => {
            debug!(len = markdown.len(), "body extracted");
            markdown
        }
        Err(e) => {
            debug!(error = %e, "no readable body");
            String::new()
        }
    }
}

fn try_extract_body(html: &str, base_url: Option<&Url>) -> Result<String> {
    let doc = Html::parse_document(html);
    let region = readability::main_content_html(&doc)
        .ok_or_else(|| ContentMillError::Extraction("no readable region".into()))?;

    let converter = htmd::HtmlToMarkdown::builder()
        .skip_tags(SKIP_TAGS.to_vec())
        .build();

    let raw_markdown = converter
        .convert(&region)
        .map_err(|e| ContentMillError::Extraction(format!("htmd conversion failed: {e}")))?;

    let cleaned = cleanup::run_pipeline(&raw_markdown, base_url);
    if !cleaned.chars().any(char::is_alphanumeric) {
        return Err(ContentMillError::Extraction("region has no text".into()));
    }

    Ok(cleaned)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn load_fixture(name: &str) -> String {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures")
            .join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    // --- Text cleaning ---

    #[test]
    fn clean_text_collapses_and_filters() {
        let cleaned = clean_text("Hello   world!!\n\n<script>bad</script>");
        assert_eq!(cleaned, "Hello world!! scriptbadscript");
        assert!(!cleaned.contains("  "));
        assert!(!cleaned.contains('<'));
    }

    #[test]
    fn clean_text_keeps_allowlisted_punctuation() {
        let input = r#"A-b. c, d! e? f; g: (h) [i] {j} "k" 'l'"#;
        assert_eq!(clean_text(input), input);
    }

    #[test]
    fn clean_text_never_double_spaces() {
        assert_eq!(clean_text("  Tom & Jerry  "), "Tom Jerry");
    }

    // --- Titles ---

    #[test]
    fn title_prefers_h1() {
        let doc = Html::parse_document(
            "<html><head><title>Site | Post</title></head><body><h1> My  Post </h1></body></html>",
        );
        assert_eq!(extract_title(&doc, "https://example.com/x"), "My Post");
    }

    #[test]
    fn title_skips_empty_h1_and_uses_title_tag() {
        let doc = Html::parse_document(
            "<html><head><title>Fallback Title</title></head><body><h1>   </h1></body></html>",
        );
        assert_eq!(extract_title(&doc, "https://example.com/x"), "Fallback Title");
    }

    #[test]
    fn title_from_class_name() {
        let doc = Html::parse_document(
            r#"<html><body><div class="post-title-wrapper">Class Title</div><h2>Sub</h2></body></html>"#,
        );
        assert_eq!(extract_title(&doc, "https://example.com/x"), "Class Title");
    }

    #[test]
    fn title_falls_back_to_url_slug() {
        let doc = Html::parse_document("<html><body><p>no headings here</p></body></html>");
        assert_eq!(
            extract_title(&doc, "https://example.com/my-great-post"),
            "My Great Post"
        );
    }

    #[test]
    fn title_from_url_edge_cases() {
        assert_eq!(title_from_url("https://example.com/blog/hello-WORLD/").as_deref(), Some("Hello World"));
        assert_eq!(title_from_url("https://example.com/post.html").as_deref(), Some("Post"));
        assert_eq!(title_from_url("https://example.com/"), None);
    }

    #[test]
    fn title_placeholder_when_nothing_matches() {
        let doc = Html::parse_document("<html><body></body></html>");
        assert_eq!(extract_title(&doc, "https://example.com/"), UNTITLED);
    }

    // --- Bodies ---

    #[test]
    fn body_uses_atx_headings_and_drops_chrome() {
        let html = r#"<html><body>
            <nav><a href="/">Home</a></nav>
            <article><h2>Section</h2><p>Readable paragraph of text.</p></article>
            <footer><p>Copyright 2024</p></footer>
        </body></html>"#;

        let body = extract_body(html);
        assert!(body.contains("## Section"), "body: {body}");
        assert!(body.contains("Readable paragraph of text."));
        assert!(!body.contains("Copyright"));
        assert!(!body.contains("Home"));
    }

    #[test]
    fn body_resolves_relative_links() {
        let html = r#"<html><body><article><p>See <a href="/blog/other">the other post</a> for details.</p></article></body></html>"#;
        let base = Url::parse("https://blog.test/blog/first").unwrap();
        let body = extract_body_with_base(html, Some(&base));
        assert!(body.contains("(https://blog.test/blog/other)"), "body: {body}");
    }

    #[test]
    fn body_empty_for_script_shell() {
        let html = load_fixture("html/js-shell.html");
        assert_eq!(extract_body(&html), "");
    }

    #[test]
    fn body_empty_for_garbage() {
        assert_eq!(extract_body(""), "");
        assert_eq!(extract_body("<<<>>>"), "");
    }

    #[test]
    fn article_fixture_extracts() {
        let html = load_fixture("html/article.html");
        let doc = Html::parse_document(&html);

        assert_eq!(
            extract_title(&doc, "https://blog.test/blog/rust-ownership"),
            "Understanding Ownership"
        );

        let body = extract_body(&html);
        assert!(body.contains("Ownership is Rust's most unique feature"));
        assert!(body.contains("## Borrowing"));
        assert!(!body.contains("Subscribe to our newsletter"));
        assert!(!body.contains("All rights reserved"));
    }
}

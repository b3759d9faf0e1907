//! Main-region isolation for article pages.
//!
//! Three passes, first hit wins:
//! 1. semantic article containers (`article`, `main`, `[role="main"]`, ...)
//! 2. the `div`/`section` that directly holds the most prose
//! 3. the whole `<body>`, with page chrome removed
//!
//! The chosen region is returned as HTML with navigation, ads, and scripts
//! stripped, ready for markdown conversion.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

/// Containers that conventionally hold the article body, most specific first.
const SEMANTIC_SELECTORS: &[&str] = &[
    r#"[itemprop="articleBody"]"#,
    ".post-content",
    ".entry-content",
    ".article-content",
    ".post-body",
    "article",
    r#"[role="main"]"#,
    "main",
];

/// A semantic container needs at least this much visible text to be trusted.
const MIN_SEMANTIC_TEXT: usize = 25;

/// Paragraphs shorter than this do not vote for a block.
const MIN_PARAGRAPH_TEXT: usize = 25;

/// A winning block must hold at least this much visible text.
const MIN_BLOCK_TEXT: usize = 140;

/// Elements whose text is never part of the readable page.
const INVISIBLE_TAGS: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Chrome removed from any chosen region.
const CHROME_SELECTOR: &str = "script, style, noscript, iframe, form, button, nav, aside, \
     .sidebar, .nav, .menu, .advert, .ads, .ad, .share, .social, .comments, .related";

/// Page header and footer, removed from generic blocks and the body.
const BODY_CHROME_SELECTOR: &str = "header, footer";

static BOILERPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^|[\s_-])(nav|navbar|menu|footer|header|sidebar|comment|comments|advert|ads?|banner|cookie|share|social|related|promo|subscribe|newsletter|breadcrumbs?)([\s_-]|$)",
    )
    .expect("boilerplate regex")
});

/// Isolate the main article region of a parsed document.
///
/// Returns `None` when no region holds any visible text.
pub(crate) fn main_content_html(doc: &Html) -> Option<String> {
    if let Some(el) = semantic_container(doc) {
        return Some(strip_chrome(&el.inner_html(), CHROME_SELECTOR));
    }

    if let Some(el) = densest_block(doc) {
        let html = strip_chrome(&el.inner_html(), BODY_CHROME_SELECTOR);
        return Some(strip_chrome(&html, CHROME_SELECTOR));
    }

    let body_sel = Selector::parse("body").expect("body selector");
    let body = doc.select(&body_sel).next()?;
    if visible_text(body).trim().is_empty() {
        return None;
    }

    let html = strip_chrome(&body.inner_html(), BODY_CHROME_SELECTOR);
    Some(strip_chrome(&html, CHROME_SELECTOR))
}

fn semantic_container(doc: &Html) -> Option<ElementRef<'_>> {
    for sel_str in SEMANTIC_SELECTORS {
        let Ok(sel) = Selector::parse(sel_str) else {
            continue;
        };
        let found = doc
            .select(&sel)
            .find(|el| collapsed_len(&visible_text(*el)) >= MIN_SEMANTIC_TEXT);
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Pick the `div`/`section` that directly holds the most prose.
///
/// Each paragraph outside page chrome scores its parent in full and its
/// grandparent at half weight, so a wrapper never outvotes the block that
/// actually contains the paragraphs. Scores are then scaled down by link
/// density.
fn densest_block(doc: &Html) -> Option<ElementRef<'_>> {
    let p_sel = Selector::parse("p, pre").expect("paragraph selector");

    let mut candidates: Vec<(f64, ElementRef<'_>)> = Vec::new();
    for p in doc.select(&p_sel) {
        if in_chrome(p) {
            continue;
        }
        let text = visible_text(p);
        let len = collapsed_len(&text);
        if len < MIN_PARAGRAPH_TEXT {
            continue;
        }
        let score = 1.0 + text.matches(',').count() as f64 + (len / 100).min(3) as f64;

        let mut ancestors = p.ancestors().filter_map(ElementRef::wrap);
        for weight in [1.0, 0.5] {
            let Some(block) = ancestors.next() else {
                break;
            };
            if !matches!(block.value().name(), "div" | "section") {
                continue;
            }
            match candidates.iter_mut().find(|(_, c)| c.id() == block.id()) {
                Some((total, _)) => *total += score * weight,
                None => candidates.push((score * weight, block)),
            }
        }
    }

    let mut best: Option<(f64, ElementRef<'_>)> = None;
    for (score, el) in candidates {
        let text_len = collapsed_len(&visible_text(el));
        if text_len < MIN_BLOCK_TEXT {
            continue;
        }
        let score = score * (1.0 - link_density(el, text_len));
        if best.as_ref().is_none_or(|(top, _)| score > *top) {
            best = Some((score, el));
        }
    }

    best.map(|(_, el)| el)
}

/// True when the element sits inside navigation, header/footer, or a
/// boilerplate-classed container.
fn in_chrome(el: ElementRef<'_>) -> bool {
    el.ancestors().filter_map(ElementRef::wrap).any(|anc| {
        matches!(
            anc.value().name(),
            "header" | "footer" | "nav" | "aside" | "form"
        ) || INVISIBLE_TAGS.contains(&anc.value().name())
            || is_boilerplate(&anc)
    })
}

fn is_boilerplate(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    [value.attr("class"), value.attr("id")]
        .into_iter()
        .flatten()
        .any(|attr| BOILERPLATE_RE.is_match(attr))
}

/// Share of the element's visible text that sits inside links.
fn link_density(el: ElementRef<'_>, text_len: usize) -> f64 {
    let a_sel = Selector::parse("a").expect("a selector");
    let link_len: usize = el
        .select(&a_sel)
        .map(|a| collapsed_len(&visible_text(a)))
        .sum();
    (link_len as f64 / text_len.max(1) as f64).min(1.0)
}

/// Text content of an element, skipping script/style subtrees.
pub(crate) fn visible_text(el: ElementRef<'_>) -> String {
    let mut out = String::new();
    for node in el.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE_TAGS.contains(&e.name()))
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

fn collapsed_len(text: &str) -> usize {
    text.split_whitespace().map(|w| w.chars().count() + 1).sum()
}

/// Remove every element matching `selector` from an HTML fragment.
fn strip_chrome(html: &str, selector: &str) -> String {
    let Ok(chrome_sel) = Selector::parse(selector) else {
        return html.to_string();
    };
    let doc = Html::parse_fragment(html);

    let mut result = doc.root_element().inner_html();
    for el in doc.select(&chrome_sel) {
        let outer = el.html();
        result = result.replace(&outer, "");
    }
    result
}

//! Post-conversion cleanup passes for extracted article markdown.
//!
//! Each pass is a function `&str -> String` applied in sequence.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Run the full cleanup pipeline on raw markdown text.
pub(crate) fn run_pipeline(md: &str, base_url: Option<&Url>) -> String {
    let mut result = md.to_string();

    result = normalize_headings(&result);
    result = strip_leftover_html(&result);
    result = drop_empty_links(&result);
    result = resolve_links(&result, base_url);
    result = trim_line_ends(&result);
    result = collapse_blank_lines(&result);

    result.trim().to_string()
}

// ---------------------------------------------------------------------------
// Headings
// ---------------------------------------------------------------------------

/// Keep a single H1 per article; later H1s become H2.
fn normalize_headings(md: &str) -> String {
    static H_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(#{1,6})\s+(.+)$").expect("valid regex")
    });

    let mut seen_h1 = false;
    let mut in_code = false;
    let mut lines: Vec<String> = Vec::new();

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
        }
        match H_RE.captures(line) {
            Some(caps) if !in_code && &caps[1] == "#" => {
                if seen_h1 {
                    lines.push(format!("## {}", &caps[2]));
                } else {
                    seen_h1 = true;
                    lines.push(line.to_string());
                }
            }
            _ => lines.push(line.to_string()),
        }
    }

    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Leftover HTML
// ---------------------------------------------------------------------------

/// Remove wrapper tags that survived conversion, keeping their text.
/// Fenced code blocks are left untouched.
fn strip_leftover_html(md: &str) -> String {
    static HTML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"</?(?:div|span|section|article|aside|header|footer|figure|figcaption|details|summary|picture|source|time|font|center)(?:\s[^>]*)?/?>")
            .expect("valid regex")
    });

    let mut out: Vec<String> = Vec::new();
    let mut in_code = false;

    for line in md.lines() {
        if line.trim_start().starts_with("```") {
            in_code = !in_code;
            out.push(line.to_string());
            continue;
        }
        if in_code {
            out.push(line.to_string());
        } else {
            out.push(HTML_TAG_RE.replace_all(line, "").into_owned());
        }
    }

    out.join("\n")
}

// ---------------------------------------------------------------------------
// Links
// ---------------------------------------------------------------------------

/// Drop links with no visible text (icon anchors, share buttons).
fn drop_empty_links(md: &str) -> String {
    static EMPTY_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(^|[^!])\[\s*\]\([^)]*\)").expect("valid regex")
    });

    EMPTY_LINK_RE.replace_all(md, "$1").into_owned()
}

/// Resolve relative URLs in markdown links against the page URL.
fn resolve_links(md: &str, base_url: Option<&Url>) -> String {
    let Some(base) = base_url else {
        return md.to_string();
    };

    static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(!?)\[([^\]]*)\]\(([^)\s]+)\)").expect("valid regex")
    });

    LINK_RE
        .replace_all(md, |caps: &regex::Captures| {
            let bang = &caps[1];
            let text = &caps[2];
            let href = &caps[3];

            if href.starts_with("http://")
                || href.starts_with("https://")
                || href.starts_with('#')
                || href.starts_with("mailto:")
                || href.starts_with("data:")
            {
                return caps[0].to_string();
            }

            match base.join(href) {
                Ok(resolved) => format!("{bang}[{text}]({resolved})"),
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Whitespace
// ---------------------------------------------------------------------------

fn trim_line_ends(md: &str) -> String {
    md.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// At most one blank line between blocks.
fn collapse_blank_lines(md: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\n{3,}").expect("valid regex")
    });

    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demotes_second_h1() {
        let input = "# Title\n\ntext\n\n# Again";
        assert_eq!(normalize_headings(input), "# Title\n\ntext\n\n## Again");
    }

    #[test]
    fn headings_inside_code_untouched() {
        let input = "# Title\n\n```sh\n# comment\n```";
        assert_eq!(normalize_headings(input), input);
    }

    #[test]
    fn strips_wrapper_tags_outside_code() {
        let input = "<div class=\"note\">Keep me</div>\n```html\n<div>code</div>\n```";
        let result = strip_leftover_html(input);
        assert!(result.starts_with("Keep me"));
        assert!(result.contains("<div>code</div>"));
    }

    #[test]
    fn empty_links_removed_images_kept() {
        let input = "Share [](https://x.com/share) ![](/img.png)";
        let result = drop_empty_links(input);
        assert_eq!(result, "Share  ![](/img.png)");
    }

    #[test]
    fn relative_links_resolved() {
        let base = Url::parse("https://blog.test/blog/post").unwrap();
        let result = resolve_links("[Next](/blog/next) ![Pic](img.png) [Top](#top)", Some(&base));
        assert_eq!(
            result,
            "[Next](https://blog.test/blog/next) ![Pic](https://blog.test/blog/img.png) [Top](#top)"
        );
    }

    #[test]
    fn pipeline_trims_and_collapses() {
        let input = "\n\n# Title   \n\n\n\n\nBody<span> text</span>\n\n\n";
        let result = run_pipeline(input, None);
        assert_eq!(result, "# Title\n\nBody text");
    }
}

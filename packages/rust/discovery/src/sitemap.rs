//! Sitemap strategy.

use std::collections::HashSet;

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{debug, info, instrument, warn};
use url::Url;

use contentmill_crawler::PageScraper;
use contentmill_shared::{ContentMillError, Result};

use crate::{Discovery, DiscoveryStrategy, DiscoverySession, tolerate};

/// Sitemap locations probed under the base URL, in order.
pub const SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml"];

/// Path fragments that mark a sitemap location as a post.
const POST_MARKERS: &[&str] = &["/blog/", "/post/", "/article/"];

/// Locations found in a sitemap document.
#[derive(Debug, Default, PartialEq)]
pub struct SitemapEntries {
    /// `<url><loc>` values.
    pub pages: Vec<String>,
    /// `<sitemap><loc>` values from a sitemap index.
    pub children: Vec<String>,
}

/// Finds posts listed in the site's sitemap.
#[derive(Debug, Default)]
pub struct SitemapStrategy;

#[async_trait]
impl DiscoveryStrategy for SitemapStrategy {
    fn name(&self) -> &'static str {
        "sitemap"
    }

    #[instrument(skip_all, fields(strategy = "sitemap", base = %session.base_url()))]
    async fn discover(
        &self,
        scraper: &PageScraper,
        session: &mut DiscoverySession,
    ) -> Result<Discovery> {
        for path in SITEMAP_PATHS {
            let sitemap_url = session.join(path);
            session.record_attempt(self.name());

            let fetched = match scraper.probe(&sitemap_url).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    tolerate(e)?;
                    continue;
                }
            };

            let entries = match parse_sitemap(&fetched.body) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(url = %sitemap_url, error = %e, "not a sitemap");
                    continue;
                }
            };
            info!(
                url = %sitemap_url,
                pages = entries.pages.len(),
                children = entries.children.len(),
                "found sitemap"
            );

            let mut pages = entries.pages;
            for child in &entries.children {
                pages.extend(fetch_child_pages(scraper, child).await?);
            }

            let posts = post_urls(pages);
            debug!(posts = posts.len(), "post locations after filtering");

            let items = scraper.scrape_all(&posts).await?;
            if !items.is_empty() {
                return Ok(Discovery::matched(items));
            }
        }

        Ok(Discovery::no_match())
    }
}

/// Page locations of one child sitemap. Nested indexes are not followed.
async fn fetch_child_pages(scraper: &PageScraper, child: &str) -> Result<Vec<String>> {
    let fetched = match scraper.probe(child).await {
        Ok(fetched) => fetched,
        Err(e) => {
            tolerate(e)?;
            return Ok(Vec::new());
        }
    };
    match parse_sitemap(&fetched.body) {
        Ok(entries) => Ok(entries.pages),
        Err(e) => {
            warn!(url = %child, error = %e, "skipping unreadable child sitemap");
            Ok(Vec::new())
        }
    }
}

/// Keep post-like locations, first occurrence order.
fn post_urls(pages: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    pages
        .into_iter()
        .filter(|loc| is_post_location(loc))
        .filter(|loc| seen.insert(loc.clone()))
        .collect()
}

fn is_post_location(loc: &str) -> bool {
    let path = Url::parse(loc)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| loc.to_string());
    POST_MARKERS.iter().any(|marker| path.contains(marker))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a `<urlset>` or `<sitemapindex>` document.
pub fn parse_sitemap(xml: &str) -> Result<SitemapEntries> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut is_sitemap = false;
    let mut in_url = false;
    let mut in_sitemap = false;
    let mut in_loc = false;
    let mut loc = String::new();
    let mut entries = SitemapEntries::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"urlset" | b"sitemapindex" => is_sitemap = true,
                b"url" => {
                    in_url = true;
                    loc.clear();
                }
                b"sitemap" => {
                    in_sitemap = true;
                    loc.clear();
                }
                b"loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_loc {
                    loc.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::CData(e)) => {
                if in_loc {
                    loc.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"loc" => in_loc = false,
                b"url" if in_url => {
                    push_loc(&mut entries.pages, &loc);
                    in_url = false;
                }
                b"sitemap" if in_sitemap => {
                    push_loc(&mut entries.children, &loc);
                    in_sitemap = false;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ContentMillError::parse(format!("sitemap XML: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if !is_sitemap {
        return Err(ContentMillError::parse("document is not a sitemap"));
    }
    Ok(entries)
}

fn push_loc(into: &mut Vec<String>, loc: &str) {
    let loc = loc.trim();
    if !loc.is_empty() {
        into.push(loc.to_string());
    }
}

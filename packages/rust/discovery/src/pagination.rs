//! Paginated listing crawl, the strategy of last resort.

use std::collections::HashSet;

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

use contentmill_crawler::PageScraper;
use contentmill_shared::Result;

use crate::{Discovery, DiscoveryStrategy, DiscoverySession, tolerate};

/// Path prefix of a post link.
const BLOG_PREFIX: &str = "/blog/";

/// Walks `?page=N`-style listing pages and scrapes every `/blog/<slug>` link.
#[derive(Debug)]
pub struct PaginationStrategy {
    max_pages: u32,
}

impl PaginationStrategy {
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages }
    }

    /// First listing variant for `page` that answers with 2xx.
    async fn fetch_listing(
        &self,
        scraper: &PageScraper,
        base_url: &str,
        page: u32,
    ) -> Result<Option<(String, String)>> {
        for url in page_variants(base_url, page) {
            match scraper.fetch_page(&url).await {
                Ok(fetched) => return Ok(Some((url, fetched.body))),
                Err(e) => {
                    tolerate(e)?;
                    debug!(url = %url, "listing variant failed");
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl DiscoveryStrategy for PaginationStrategy {
    fn name(&self) -> &'static str {
        "pagination"
    }

    /// Always reports a match, possibly with zero items.
    #[instrument(skip_all, fields(strategy = "pagination", base = %session.base_url(), max_pages = self.max_pages))]
    async fn discover(
        &self,
        scraper: &PageScraper,
        session: &mut DiscoverySession,
    ) -> Result<Discovery> {
        let base_url = session.base_url().to_string();
        let base = session.base().clone();
        let mut items = Vec::new();

        for page in 1..=self.max_pages {
            session.record_attempt(self.name());

            let Some((listing_url, html)) = self.fetch_listing(scraper, &base_url, page).await? else {
                info!(page, "no listing variant answered, stopping");
                break;
            };

            let mut links = blog_links(&html, &base);
            if links.is_empty() {
                debug!(page, "no post links in static HTML, rendering");
                match scraper.render_page(&listing_url).await {
                    Ok(rendered) => links = blog_links(&rendered, &base),
                    Err(e) => {
                        tolerate(e)?;
                    }
                }
            }
            if links.is_empty() {
                info!(page, "listing has no post links, stopping");
                break;
            }

            let fresh: Vec<String> = links
                .into_iter()
                .filter(|link| session.mark_visited(link))
                .collect();
            debug!(page, new_links = fresh.len(), "listing page parsed");

            items.extend(scraper.scrape_all(&fresh).await?);
        }

        Ok(Discovery::matched(items))
    }
}

/// Listing URLs tried for page `page`, in order.
pub fn page_variants(base_url: &str, page: u32) -> [String; 4] {
    [
        format!("{base_url}?page={page}"),
        format!("{base_url}/page/{page}"),
        format!("{base_url}/p/{page}"),
        format!("{base_url}?paged={page}"),
    ]
}

/// Post links on a listing page, absolute and in first-occurrence order.
///
/// A link qualifies when it resolves to the base URL's host and its path is
/// `/blog/` followed by at least one more character. Fragments are dropped.
pub fn blog_links(html: &str, base: &Url) -> Vec<String> {
    let Ok(anchor_sel) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);

    let mut seen = HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&anchor_sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base.join(href.trim()) else {
            continue;
        };
        if resolved.host_str() != base.host_str() || resolved.port() != base.port() {
            continue;
        }
        let path = resolved.path();
        if !path.starts_with(BLOG_PREFIX) || path.len() <= BLOG_PREFIX.len() {
            continue;
        }

        resolved.set_fragment(None);
        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }
    links
}

//! Blog post discovery.
//!
//! A blog's posts are found by one of three strategies, tried in order by the
//! orchestrator: an RSS/Atom feed, a sitemap, or a crawl of paginated
//! listing pages. Each strategy turns the URLs it finds into blog items via
//! the shared [`PageScraper`].

mod feed;
mod pagination;
mod session;
mod sitemap;

use async_trait::async_trait;

use contentmill_crawler::PageScraper;
use contentmill_shared::{ContentItem, ContentMillError, Result};

pub use feed::{FEED_PATHS, FeedStrategy, parse_feed_links};
pub use pagination::{PaginationStrategy, blog_links, page_variants};
pub use session::DiscoverySession;
pub use sitemap::{SITEMAP_PATHS, SitemapEntries, SitemapStrategy, parse_sitemap};

// ---------------------------------------------------------------------------
// Strategy contract
// ---------------------------------------------------------------------------

/// Outcome of one strategy.
#[derive(Debug, Default)]
pub struct Discovery {
    pub items: Vec<ContentItem>,
    /// Whether the strategy recognized the site at all.
    pub matched: bool,
}

impl Discovery {
    pub fn matched(items: Vec<ContentItem>) -> Self {
        Self {
            items,
            matched: true,
        }
    }

    pub fn no_match() -> Self {
        Self::default()
    }

    /// A match that produced at least one item.
    pub fn is_success(&self) -> bool {
        self.matched && !self.items.is_empty()
    }
}

/// A way of finding a blog's posts.
///
/// Implementations never fail for per-URL problems; they log and move on.
/// The only error they return is [`ContentMillError::Cancelled`].
#[async_trait]
pub trait DiscoveryStrategy: Send + Sync {
    /// Short name used in logs and progress output.
    fn name(&self) -> &'static str;

    async fn discover(
        &self,
        scraper: &PageScraper,
        session: &mut DiscoverySession,
    ) -> Result<Discovery>;
}

/// Swallow a probe error unless it is a cancellation.
fn tolerate(err: ContentMillError) -> Result<()> {
    if err.is_cancelled() { Err(err) } else { Ok(()) }
}

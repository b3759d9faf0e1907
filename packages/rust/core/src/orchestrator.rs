//! Strategy selection for one blog.

use tracing::{info, instrument};

use contentmill_crawler::PageScraper;
use contentmill_discovery::{
    Discovery, DiscoverySession, DiscoveryStrategy, FeedStrategy, PaginationStrategy,
    SitemapStrategy,
};
use contentmill_shared::{ContentItem, Result};

/// Runs the discovery strategies in their fixed priority order.
pub struct Orchestrator {
    strategies: Vec<Box<dyn DiscoveryStrategy>>,
}

impl Orchestrator {
    /// Feed, then sitemap, then a pagination crawl of up to `max_pages`.
    pub fn new(max_pages: u32) -> Self {
        Self {
            strategies: vec![
                Box::new(FeedStrategy),
                Box::new(SitemapStrategy),
                Box::new(PaginationStrategy::new(max_pages)),
            ],
        }
    }

    /// Names of the strategies, in the order they are tried.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Items from the first strategy that matches with at least one item.
    ///
    /// When none does, the last strategy's result is returned as is
    /// (possibly empty). Later strategies are never started once one
    /// succeeds.
    #[instrument(skip(self, scraper))]
    pub async fn discover(&self, scraper: &PageScraper, base_url: &str) -> Result<Vec<ContentItem>> {
        let mut session = DiscoverySession::new(base_url)?;
        let mut last = Discovery::no_match();

        for strategy in &self.strategies {
            scraper.check_cancelled()?;
            scraper.progress().phase(strategy.name());

            let found = strategy.discover(scraper, &mut session).await?;
            if found.is_success() {
                info!(strategy = strategy.name(), items = found.items.len(), "strategy succeeded");
                return Ok(found.items);
            }
            info!(strategy = strategy.name(), matched = found.matched, "strategy produced nothing");
            last = found;
        }

        Ok(last.items)
    }
}

/// Discover and scrape every post of the blog at `base_url`.
pub async fn discover_all(
    scraper: &PageScraper,
    base_url: &str,
    max_pages: u32,
) -> Result<Vec<ContentItem>> {
    Orchestrator::new(max_pages).discover(scraper, base_url).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use contentmill_crawler::NoopRenderer;
    use contentmill_shared::{ContentType, ScrapeConfig};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE: &str = "<html><body><article><h1>Post</h1><p>Readable body text for the post.</p></article></body></html>";

    fn scraper() -> PageScraper {
        let config = ScrapeConfig {
            courtesy_delay: Duration::from_millis(1),
            ..ScrapeConfig::default()
        };
        PageScraper::with_renderer(config, Box::new(NoopRenderer)).unwrap()
    }

    async fn serve(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    #[test]
    fn strategy_order_is_fixed() {
        assert_eq!(
            Orchestrator::new(10).strategy_names(),
            vec!["feed", "sitemap", "pagination"]
        );
    }

    #[tokio::test]
    async fn feed_success_skips_later_strategies() {
        let server = MockServer::start().await;
        let uri = server.uri();
        serve(
            &server,
            "/feed",
            format!(
                "<rss><channel><item><link>{uri}/blog/one</link></item><item><link>{uri}/blog/two</link></item></channel></rss>"
            ),
        )
        .await;
        serve(&server, "/blog/one", ARTICLE.to_string()).await;
        serve(&server, "/blog/two", ARTICLE.to_string()).await;
        for never in ["/sitemap.xml", "/sitemap_index.xml", "/page/1"] {
            Mock::given(path(never))
                .respond_with(ResponseTemplate::new(200))
                .expect(0)
                .mount(&server)
                .await;
        }
        Mock::given(path("/"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let items = discover_all(&scraper(), &uri, 10).await.unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.content_type == ContentType::Blog));
        assert_eq!(items[0].source_url, format!("{uri}/blog/one"));
        assert_eq!(items[1].source_url, format!("{uri}/blog/two"));
    }

    #[tokio::test]
    async fn falls_back_to_pagination_with_max_pages() {
        let server = MockServer::start().await;
        let uri = server.uri();
        for probe in ["/feed", "/rss", "/feed.xml", "/rss.xml", "/sitemap.xml", "/sitemap_index.xml"] {
            Mock::given(path(probe))
                .respond_with(ResponseTemplate::new(404))
                .expect(1)
                .mount(&server)
                .await;
        }
        for page in ["1", "2"] {
            Mock::given(path("/"))
                .and(query_param("page", page))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(format!(r#"<a href="/blog/p{page}">post</a>"#)),
                )
                .expect(1)
                .mount(&server)
                .await;
        }
        Mock::given(path("/"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        serve(&server, "/blog/p1", ARTICLE.to_string()).await;
        serve(&server, "/blog/p2", ARTICLE.to_string()).await;

        let items = discover_all(&scraper(), &uri, 2).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].source_url, format!("{uri}/blog/p1"));
    }

    #[tokio::test]
    async fn nothing_found_is_empty_not_error() {
        let server = MockServer::start().await;
        let items = discover_all(&scraper(), &server.uri(), 3).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn invalid_base_url_is_rejected() {
        let err = discover_all(&scraper(), "not a url", 3).await.unwrap_err();
        assert!(matches!(err, contentmill_shared::ContentMillError::Validation { .. }));
    }
}

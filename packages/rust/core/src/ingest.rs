//! Ingestion entry points: documents, blogs, or both.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use contentmill_crawler::PageScraper;
use contentmill_shared::{
    ContentItem, IngestBatch, ProgressReporter, Result, ScrapeConfig, TeamIdGenerator, UuidTeamIds,
};

use crate::orchestrator::Orchestrator;

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

/// Chunk one PDF into book items. Unreadable documents yield an empty list.
pub async fn ingest_pdf(bytes: Vec<u8>, chunk_size: usize) -> Vec<ContentItem> {
    contentmill_pdf::extract_chunks(bytes, chunk_size).await
}

/// Chunk several PDFs, concatenating their items in input order.
///
/// Each document is processed independently; one failing contributes nothing.
pub async fn ingest_pdfs(documents: Vec<Vec<u8>>, chunk_size: usize) -> Vec<ContentItem> {
    let total = documents.len();
    let mut items = Vec::new();
    for (i, bytes) in documents.into_iter().enumerate() {
        let chunks = ingest_pdf(bytes, chunk_size).await;
        info!(document = i + 1, total, chunks = chunks.len(), "document ingested");
        items.extend(chunks);
    }
    items
}

// ---------------------------------------------------------------------------
// Blogs
// ---------------------------------------------------------------------------

/// Owns the scraper (and so the browser session) for one ingestion run.
///
/// Call [`Ingestor::close`] when done, or wrap the work in
/// [`Ingestor::closing`]. Dropping the ingestor without closing still kills
/// the browser process.
pub struct Ingestor {
    scraper: PageScraper,
    team_ids: Box<dyn TeamIdGenerator>,
}

impl Ingestor {
    pub fn new(scraper: PageScraper) -> Self {
        Self {
            scraper,
            team_ids: Box::new(UuidTeamIds),
        }
    }

    /// Build an ingestor with the default renderer for `config`.
    pub fn from_config(config: ScrapeConfig) -> Result<Self> {
        Ok(Self::new(PageScraper::new(config)?))
    }

    pub fn with_team_ids(mut self, team_ids: Box<dyn TeamIdGenerator>) -> Self {
        self.team_ids = team_ids;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.scraper = self.scraper.with_cancellation(token);
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.scraper = self.scraper.with_progress(progress);
        self
    }

    pub fn scraper(&self) -> &PageScraper {
        &self.scraper
    }

    /// Wrap `items` with a freshly generated team id.
    pub fn batch(&self, items: Vec<ContentItem>) -> IngestBatch {
        IngestBatch {
            team_id: self.team_ids.next_id(),
            items,
        }
    }

    /// All posts of one blog, using the configured page limit.
    pub async fn ingest_blog_url(&self, url: &str) -> Result<Vec<ContentItem>> {
        self.ingest_blog(url, self.scraper.config().max_pages).await
    }

    #[instrument(skip(self))]
    async fn ingest_blog(&self, url: &str, max_pages: u32) -> Result<Vec<ContentItem>> {
        let mut items = Orchestrator::new(max_pages).discover(&self.scraper, url).await?;
        for item in &mut items {
            if item.source_url.is_empty() {
                item.source_url = url.to_string();
            }
        }
        info!(items = items.len(), "blog ingested");
        Ok(items)
    }

    /// Posts of several blogs, concatenated in input order.
    ///
    /// A blog that cannot be ingested is skipped; cancellation stops the run.
    pub async fn ingest_blog_urls(&self, urls: &[String]) -> Result<Vec<ContentItem>> {
        self.ingest_blogs(urls, self.scraper.config().max_pages).await
    }

    async fn ingest_blogs(&self, urls: &[String], max_pages: u32) -> Result<Vec<ContentItem>> {
        let mut items = Vec::new();
        for url in urls {
            match self.ingest_blog(url, max_pages).await {
                Ok(found) => items.extend(found),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(url = %url, error = %e, "skipping blog"),
            }
        }
        Ok(items)
    }

    /// Documents first, then blogs, in one batch under a new team id.
    pub async fn ingest_mixed(
        &self,
        documents: Vec<Vec<u8>>,
        urls: &[String],
        max_pages: u32,
    ) -> Result<IngestBatch> {
        let chunk_size = self.scraper.config().chunk_size;

        self.scraper.progress().phase("documents");
        self.scraper.check_cancelled()?;
        let mut items = ingest_pdfs(documents, chunk_size).await;
        let books = items.len();

        items.extend(self.ingest_blogs(urls, max_pages).await?);
        info!(books, blogs = items.len() - books, "mixed ingestion finished");

        Ok(self.batch(items))
    }

    /// Run `work`, then close the browser whatever the outcome.
    pub async fn closing<T>(&self, work: impl Future<Output = Result<T>>) -> Result<T> {
        let result = work.await;
        if let Err(e) = self.close().await {
            warn!(error = %e, "failed to close browser session");
        }
        result
    }

    /// Release the browser session. Safe to call more than once.
    pub async fn close(&self) -> Result<()> {
        self.scraper.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use contentmill_crawler::{NoopRenderer, Renderer};
    use contentmill_shared::{ContentMillError, ContentType, FixedTeamId};
    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE: &str = "<html><body><article><h1>Post</h1><p>Readable body text for the post.</p></article></body></html>";

    struct CountingRenderer(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Renderer for CountingRenderer {
        async fn render(&self, url: &str) -> Result<String> {
            Err(ContentMillError::Render(format!("{url}: offline")))
        }

        async fn close(&self) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config() -> ScrapeConfig {
        ScrapeConfig {
            courtesy_delay: Duration::from_millis(1),
            ..ScrapeConfig::default()
        }
    }

    fn ingestor() -> Ingestor {
        let scraper = PageScraper::with_renderer(config(), Box::new(NoopRenderer)).unwrap();
        Ingestor::new(scraper).with_team_ids(Box::new(FixedTeamId::default()))
    }

    async fn blog_with_feed(server: &MockServer, slugs: &[&str]) {
        let uri = server.uri();
        let items: String = slugs
            .iter()
            .map(|s| format!("<item><link>{uri}/blog/{s}</link></item>"))
            .collect();
        Mock::given(path("/feed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!("<rss><channel>{items}</channel></rss>")),
            )
            .mount(server)
            .await;
        for s in slugs {
            Mock::given(path(format!("/blog/{s}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE))
                .mount(server)
                .await;
        }
    }

    #[tokio::test]
    async fn invalid_pdfs_contribute_nothing() {
        let items = ingest_pdfs(vec![b"nope".to_vec(), Vec::new()], 2000).await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn blog_urls_concatenate_in_order_and_skip_bad_input() {
        let first = MockServer::start().await;
        let second = MockServer::start().await;
        blog_with_feed(&first, &["a"]).await;
        blog_with_feed(&second, &["b", "c"]).await;

        let urls = vec![first.uri(), "not a url".to_string(), second.uri()];
        let items = ingestor().ingest_blog_urls(&urls).await.unwrap();

        let sources: Vec<_> = items.iter().map(|i| i.source_url.clone()).collect();
        assert_eq!(
            sources,
            vec![
                format!("{}/blog/a", first.uri()),
                format!("{}/blog/b", second.uri()),
                format!("{}/blog/c", second.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn mixed_batch_puts_documents_before_blogs() {
        let server = MockServer::start().await;
        blog_with_feed(&server, &["x"]).await;

        let batch = ingestor()
            .ingest_mixed(vec![b"not a pdf".to_vec()], &[server.uri()], 5)
            .await
            .unwrap();

        assert_eq!(batch.team_id, "aline123");
        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].content_type, ContentType::Blog);
    }

    #[tokio::test]
    async fn cancellation_propagates() {
        let server = MockServer::start().await;
        blog_with_feed(&server, &["x"]).await;
        let token = CancellationToken::new();
        let ingestor = ingestor().with_cancellation(token.clone());
        token.cancel();

        let err = ingestor.ingest_blog_url(&server.uri()).await.unwrap_err();
        assert!(err.is_cancelled());

        let err = ingestor
            .ingest_blog_urls(&[server.uri()])
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[tokio::test]
    async fn closing_closes_on_error_paths() {
        let closes = Arc::new(AtomicUsize::new(0));
        let scraper =
            PageScraper::with_renderer(config(), Box::new(CountingRenderer(Arc::clone(&closes))))
                .unwrap();
        let ingestor = Ingestor::new(scraper);

        let result = ingestor.closing(ingestor.ingest_blog_url("not a url")).await;

        assert!(result.is_err());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_team_ids_are_unique() {
        let ingestor = ingestor().with_team_ids(Box::new(UuidTeamIds));
        let a = ingestor.batch(Vec::new()).team_id;
        let b = ingestor.batch(Vec::new()).team_id;
        assert_ne!(a, b);
    }
}

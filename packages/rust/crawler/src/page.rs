//! Single-page scraping with a rendering fallback.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use scraper::Html;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use contentmill_markdown::{extract_body_with_base, extract_title};
use contentmill_shared::{
    ContentItem, ContentMillError, ProgressReporter, Result, ScrapeConfig, SilentProgress,
};

use crate::fetcher::{FetchedHtml, Fetcher};
use crate::render::{ChromiumRenderer, NoopRenderer, Renderer};

/// Turns URLs into blog [`ContentItem`]s.
///
/// Owns the HTTP client, the renderer, and the cancellation token for one
/// ingestion invocation. Every network wait races the token, so cancelling
/// it aborts in-flight fetches, renders, and courtesy pauses.
pub struct PageScraper {
    config: ScrapeConfig,
    fetcher: Fetcher,
    renderer: Box<dyn Renderer>,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressReporter>,
}

impl PageScraper {
    /// Build a scraper whose renderer follows `config.render_enabled`.
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let renderer: Box<dyn Renderer> = if config.render_enabled {
            Box::new(ChromiumRenderer::new(&config))
        } else {
            Box::new(NoopRenderer)
        };
        Self::with_renderer(config, renderer)
    }

    /// Build a scraper with an explicit renderer.
    pub fn with_renderer(config: ScrapeConfig, renderer: Box<dyn Renderer>) -> Result<Self> {
        let fetcher = Fetcher::new(&config.user_agent)?;
        Ok(Self {
            config,
            fetcher,
            renderer,
            cancel: CancellationToken::new(),
            progress: Arc::new(SilentProgress),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn progress(&self) -> &dyn ProgressReporter {
        self.progress.as_ref()
    }

    /// Fail with [`ContentMillError::Cancelled`] if the token has fired.
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(ContentMillError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn guarded<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ContentMillError::Cancelled),
            res = fut => res,
        }
    }

    // -----------------------------------------------------------------------
    // Network primitives
    // -----------------------------------------------------------------------

    /// Fetch with the short probe timeout (feed and sitemap detection).
    pub async fn probe(&self, url: &str) -> Result<FetchedHtml> {
        self.fetch_with(url, self.config.probe_timeout).await
    }

    /// Fetch with the page timeout.
    pub async fn fetch_page(&self, url: &str) -> Result<FetchedHtml> {
        self.fetch_with(url, self.config.page_timeout).await
    }

    async fn fetch_with(&self, url: &str, timeout: Duration) -> Result<FetchedHtml> {
        self.guarded(self.fetcher.fetch(url, timeout)).await
    }

    /// Render `url` in the headless browser.
    pub async fn render_page(&self, url: &str) -> Result<String> {
        self.guarded(self.renderer.render(url)).await
    }

    /// Sleep for the courtesy delay, waking early on cancellation.
    pub async fn courtesy_pause(&self) -> Result<()> {
        let delay = self.config.courtesy_delay;
        self.guarded(async move {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Scraping
    // -----------------------------------------------------------------------

    /// Scrape one URL into a blog item.
    ///
    /// The title always comes from the static HTML. When the static body is
    /// empty the page is rendered and the body re-extracted; a failed render
    /// leaves the content empty rather than dropping the item.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn scrape_page(&self, url: &str) -> Result<ContentItem> {
        let fetched = self.fetch_page(url).await?;
        let base = Url::parse(url).ok();

        let title = {
            let doc = Html::parse_document(&fetched.body);
            extract_title(&doc, url)
        };
        let mut body = extract_body_with_base(&fetched.body, base.as_ref());

        if body.is_empty() {
            debug!("static body empty, rendering");
            match self.render_page(url).await {
                Ok(html) => body = extract_body_with_base(&html, base.as_ref()),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(error = %e, "render failed, keeping empty content"),
            }
        }

        Ok(ContentItem::blog(title, body, url))
    }

    /// Scrape every URL in order, pausing between requests.
    ///
    /// Per-URL failures are logged and skipped; cancellation stops the run.
    pub async fn scrape_all(&self, urls: &[String]) -> Result<Vec<ContentItem>> {
        let total = urls.len();
        let mut items = Vec::with_capacity(total);

        for (i, url) in urls.iter().enumerate() {
            if i > 0 {
                self.courtesy_pause().await?;
            }
            match self.scrape_page(url).await {
                Ok(item) => {
                    self.progress.page_scraped(url, i + 1, total);
                    items.push(item);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!(url = %url, error = %e, "skipping page"),
            }
        }

        info!(scraped = items.len(), requested = total, "pages scraped");
        Ok(items)
    }

    /// Shut down the renderer.
    pub async fn close(&self) -> Result<()> {
        self.renderer.close().await
    }
}

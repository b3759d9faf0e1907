//! Headless-browser rendering for pages whose content is built by JavaScript.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use contentmill_shared::{ContentMillError, Result, ScrapeConfig};

/// Environment variable that overrides every other Chromium lookup.
pub const CHROMIUM_PATH_ENV: &str = "CONTENTMILL_CHROMIUM_PATH";

/// Produces the post-script DOM of a page.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Load `url`, let scripts settle, and return the serialized DOM.
    async fn render(&self, url: &str) -> Result<String>;

    /// Release any browser resources. Safe to call more than once.
    async fn close(&self) -> Result<()>;
}

/// Renderer used when rendering is switched off; every call fails.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn render(&self, url: &str) -> Result<String> {
        Err(ContentMillError::Render(format!(
            "{url}: rendering is disabled"
        )))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Chromium lookup
// ---------------------------------------------------------------------------

/// Locate a Chromium binary.
///
/// Order: `CONTENTMILL_CHROMIUM_PATH`, the configured path, then
/// `google-chrome`, `chromium`, `chromium-browser` on `PATH`. `None` leaves
/// the choice to chromiumoxide's own detection.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
        warn!(path = %path.display(), "{CHROMIUM_PATH_ENV} does not exist, ignoring");
    }

    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        warn!(path = %path.display(), "configured chromium_path does not exist, ignoring");
    }

    ["google-chrome", "chromium", "chromium-browser"]
        .into_iter()
        .find_map(|name| which::which(name).ok())
}

// ---------------------------------------------------------------------------
// Chromium renderer
// ---------------------------------------------------------------------------

/// A running browser plus the task driving its CDP connection.
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserSession {
    async fn launch(chromium_path: Option<&Path>) -> Result<Self> {
        let mut builder = BrowserConfig::builder();
        if let Some(path) = find_chromium(chromium_path) {
            debug!(path = %path.display(), "using chromium");
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .new_headless_mode()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .build()
            .map_err(|e| ContentMillError::Render(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ContentMillError::Render(format!("failed to launch chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "cdp handler event error");
                }
            }
        });

        info!("headless browser started");
        Ok(Self { browser, handler })
    }

    async fn shutdown(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        closed
            .map(|_| ())
            .map_err(|e| ContentMillError::Render(format!("failed to close browser: {e}")))
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Dropping `Browser` kills the child process; the handler would
        // otherwise spin on a dead connection.
        self.handler.abort();
    }
}

/// A tab that is closed however the render ends.
///
/// Timeouts and errors return early, and cancellation drops the render
/// future mid-await; in those cases `Drop` closes the tab in the background.
struct OpenTab(Option<Page>);

impl OpenTab {
    fn page(&self) -> Result<&Page> {
        self.0
            .as_ref()
            .ok_or_else(|| ContentMillError::Render("tab already closed".into()))
    }

    async fn close(mut self) {
        let Some(page) = self.0.take() else {
            return;
        };
        if let Err(e) = page.close().await {
            debug!(error = %e, "failed to close page");
        }
    }
}

impl Drop for OpenTab {
    fn drop(&mut self) {
        let Some(page) = self.0.take() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        runtime.spawn(async move {
            if let Err(e) = page.close().await {
                debug!(error = %e, "failed to close abandoned page");
            }
        });
    }
}

/// Renders pages with a lazily launched headless Chromium.
///
/// The browser starts on the first [`Renderer::render`] call and is shared
/// by later calls until [`Renderer::close`].
pub struct ChromiumRenderer {
    settle_delay: Duration,
    navigation_timeout: Duration,
    chromium_path: Option<PathBuf>,
    session: Mutex<Option<BrowserSession>>,
}

impl ChromiumRenderer {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            settle_delay: config.settle_delay,
            navigation_timeout: config.navigation_timeout,
            chromium_path: config.chromium_path.clone(),
            session: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    #[instrument(skip(self), fields(url = %url))]
    async fn render(&self, url: &str) -> Result<String> {
        let mut guard = self.session.lock().await;
        if guard.is_none() {
            *guard = Some(BrowserSession::launch(self.chromium_path.as_deref()).await?);
        }
        let Some(session) = guard.as_ref() else {
            return Err(ContentMillError::Render("browser session unavailable".into()));
        };

        let tab = OpenTab(Some(
            session
                .browser
                .new_page("about:blank")
                .await
                .map_err(|e| ContentMillError::Render(format!("{url}: failed to open tab: {e}")))?,
        ));
        let page = tab.page()?;

        tokio::time::timeout(self.navigation_timeout, page.goto(url))
            .await
            .map_err(|_| {
                ContentMillError::Render(format!(
                    "{url}: navigation timed out after {}s",
                    self.navigation_timeout.as_secs()
                ))
            })?
            .map_err(|e| ContentMillError::Render(format!("{url}: navigation failed: {e}")))?;

        tokio::time::sleep(self.settle_delay).await;

        let html = page
            .content()
            .await
            .map_err(|e| ContentMillError::Render(format!("{url}: failed to read DOM: {e}")));

        tab.close().await;

        let html = html?;
        debug!(len = html.len(), "rendered");
        Ok(html)
    }

    async fn close(&self) -> Result<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        info!("shutting down headless browser");
        session.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_renderer_always_fails() {
        let err = NoopRenderer.render("https://example.com").await.unwrap_err();
        assert!(matches!(err, ContentMillError::Render(_)));
        assert!(NoopRenderer.close().await.is_ok());
    }

    #[tokio::test]
    async fn close_without_launch_is_noop() {
        let renderer = ChromiumRenderer::new(&ScrapeConfig::default());
        assert!(renderer.close().await.is_ok());
        assert!(renderer.close().await.is_ok());
    }

    #[test]
    fn missing_configured_path_is_ignored() {
        let found = find_chromium(Some(Path::new("/definitely/not/a/chrome")));
        assert_ne!(found.as_deref(), Some(Path::new("/definitely/not/a/chrome")));
    }

    #[tokio::test]
    #[ignore = "requires a local Chromium install"]
    async fn renders_script_built_content() {
        let renderer = ChromiumRenderer::new(&ScrapeConfig {
            settle_delay: Duration::from_millis(200),
            ..ScrapeConfig::default()
        });
        let html = renderer
            .render("data:text/html,<div id=x></div><script>document.getElementById('x').textContent='built by js'</script>")
            .await
            .unwrap();
        renderer.close().await.unwrap();
        assert!(html.contains("built by js"));
    }

    #[tokio::test]
    #[ignore = "requires a local Chromium install"]
    async fn timed_out_navigation_closes_its_tab() {
        let renderer = ChromiumRenderer::new(&ScrapeConfig {
            navigation_timeout: Duration::from_millis(1),
            ..ScrapeConfig::default()
        });
        async fn open_tabs(renderer: &ChromiumRenderer) -> usize {
            let guard = renderer.session.lock().await;
            let session = guard.as_ref().expect("browser launched");
            session.browser.pages().await.unwrap().len()
        }

        renderer.render("data:text/html,<p>warm up</p>").await.unwrap();
        let before = open_tabs(&renderer).await;

        // Non-routable address, so navigation never completes in time.
        let err = renderer.render("http://10.255.255.1/").await.unwrap_err();
        assert!(matches!(err, ContentMillError::Render(_)));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let after = open_tabs(&renderer).await;
        renderer.close().await.unwrap();
        assert_eq!(after, before);
    }
}

//! Static HTTP fetching.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use contentmill_shared::{ContentMillError, Result};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 10;

/// Maximum response size we accept (10 MB).
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// A successful static fetch.
#[derive(Debug, Clone)]
pub struct FetchedHtml {
    /// Final URL after redirects.
    pub url: String,
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

/// Static HTTP client with a fixed browser-like identity.
///
/// Never retries: non-2xx responses and transport errors are returned to
/// the caller, which decides whether to fall back to rendering.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_body: usize,
}

impl Fetcher {
    /// Build a fetcher that sends `user_agent` with every request.
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ContentMillError::Fetch(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_body: MAX_RESPONSE_SIZE,
        })
    }

    /// Override the body size cap.
    pub fn with_max_body(mut self, bytes: usize) -> Self {
        self.max_body = bytes;
        self
    }

    /// GET `url`, failing on network errors, timeouts, and non-2xx statuses.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchedHtml> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ContentMillError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentMillError::Fetch(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().to_string();
        let body = self.read_body(url, response).await?;

        debug!(status = status.as_u16(), len = body.len(), "fetched");

        Ok(FetchedHtml {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }

    /// Read the body chunk by chunk, failing once it passes the cap.
    ///
    /// The cap applies to bytes received, so chunked responses without a
    /// `Content-Length` are bounded too.
    async fn read_body(&self, url: &str, mut response: reqwest::Response) -> Result<String> {
        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ContentMillError::Fetch(format!("{url}: failed to read body: {e}")))?
        {
            let len = bytes.len() + chunk.len();
            if len > self.max_body {
                return Err(ContentMillError::Fetch(format!(
                    "{url}: response too large (over {len} bytes, max {})",
                    self.max_body
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

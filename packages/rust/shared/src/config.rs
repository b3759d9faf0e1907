//! Application configuration for contentmill.
//!
//! User config lives at `~/.contentmill/contentmill.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ContentMillError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "contentmill.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".contentmill";

/// Browser-like identity sent with every static request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching contentmill.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Static fetch settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Headless rendering settings.
    #[serde(default)]
    pub render: RenderConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Listing pages visited by the pagination crawl.
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Characters per document chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_max_pages() -> u32 {
    10
}
fn default_chunk_size() -> usize {
    2000
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// User-Agent header for static requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for feed/sitemap probes, in seconds.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Timeout for page fetches, in seconds.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Pause between successive per-item fetches, in milliseconds.
    #[serde(default = "default_courtesy_delay")]
    pub courtesy_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            probe_timeout_secs: default_probe_timeout(),
            page_timeout_secs: default_page_timeout(),
            courtesy_delay_ms: default_courtesy_delay(),
        }
    }
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.into()
}
fn default_probe_timeout() -> u64 {
    5
}
fn default_page_timeout() -> u64 {
    10
}
fn default_courtesy_delay() -> u64 {
    1000
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Whether the headless browser fallback may be used at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time given to client-side scripts after navigation, in milliseconds.
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Upper bound on a single navigation, in seconds.
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Explicit Chromium executable (auto-detected when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chromium_path: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settle_delay_ms: default_settle_delay(),
            navigation_timeout_secs: default_navigation_timeout(),
            chromium_path: None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_settle_delay() -> u64 {
    3000
}
fn default_navigation_timeout() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Scrape config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scrape configuration — merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// User-Agent header for static requests.
    pub user_agent: String,
    /// Timeout for feed/sitemap probes.
    pub probe_timeout: Duration,
    /// Timeout for page fetches.
    pub page_timeout: Duration,
    /// Pause between successive per-item fetches.
    pub courtesy_delay: Duration,
    /// Whether the rendering fallback is available.
    pub render_enabled: bool,
    /// Wait after navigation before the DOM is read.
    pub settle_delay: Duration,
    /// Upper bound on a single navigation.
    pub navigation_timeout: Duration,
    /// Explicit Chromium executable.
    pub chromium_path: Option<PathBuf>,
    /// Listing pages visited by the pagination crawl.
    pub max_pages: u32,
    /// Characters per document chunk.
    pub chunk_size: usize,
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.fetch.user_agent.clone(),
            probe_timeout: Duration::from_secs(config.fetch.probe_timeout_secs),
            page_timeout: Duration::from_secs(config.fetch.page_timeout_secs),
            courtesy_delay: Duration::from_millis(config.fetch.courtesy_delay_ms),
            render_enabled: config.render.enabled,
            settle_delay: Duration::from_millis(config.render.settle_delay_ms),
            navigation_timeout: Duration::from_secs(config.render.navigation_timeout_secs),
            chromium_path: config.render.chromium_path.as_ref().map(PathBuf::from),
            max_pages: config.defaults.max_pages,
            chunk_size: config.defaults.chunk_size,
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.contentmill/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ContentMillError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.contentmill/contentmill.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ContentMillError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        ContentMillError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ContentMillError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ContentMillError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ContentMillError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values the pipeline cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.chunk_size == 0 {
        return Err(ContentMillError::config("defaults.chunk_size must be greater than 0"));
    }
    if config.fetch.user_agent.trim().is_empty() {
        return Err(ContentMillError::config("fetch.user_agent must not be empty"));
    }
    if config.fetch.probe_timeout_secs == 0 || config.fetch.page_timeout_secs == 0 {
        return Err(ContentMillError::config("fetch timeouts must be at least 1 second"));
    }
    Ok(())
}

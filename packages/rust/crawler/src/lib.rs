//! Page acquisition for contentmill.
//!
//! - [`Fetcher`]: static HTTP GET with a browser-like identity
//! - [`Renderer`]: headless-browser fallback for script-built pages
//! - [`PageScraper`]: URL to [`contentmill_shared::ContentItem`], with
//!   cancellation and courtesy pacing

pub mod fetcher;
pub mod page;
pub mod render;

pub use fetcher::{FetchedHtml, Fetcher};
pub use page::PageScraper;
pub use render::{CHROMIUM_PATH_ENV, ChromiumRenderer, NoopRenderer, Renderer, find_chromium};

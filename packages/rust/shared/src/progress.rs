//! Progress callbacks for long-running ingestion.

/// Receives status updates while content is being discovered and scraped.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase (a discovery strategy, a document).
    fn phase(&self, name: &str);
    /// Called after each page has been scraped into an item.
    fn page_scraped(&self, url: &str, current: usize, total: usize);
    /// Called once the invocation has finished.
    fn done(&self, items: usize);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn page_scraped(&self, _url: &str, _current: usize, _total: usize) {}
    fn done(&self, _items: usize) {}
}

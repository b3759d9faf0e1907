//! Spinner-based progress on stderr.

use std::time::Duration;

use contentmill_shared::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};

/// CLI progress reporter using an indicatif spinner.
pub(crate) struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    pub(crate) fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(match name {
            "feed" => "Looking for an RSS/Atom feed".to_string(),
            "sitemap" => "Looking for a sitemap".to_string(),
            "pagination" => "Crawling listing pages".to_string(),
            "documents" => "Chunking documents".to_string(),
            other => other.to_string(),
        });
    }

    fn page_scraped(&self, url: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Scraped [{current}/{total}] {url}"));
    }

    fn done(&self, _items: usize) {
        self.spinner.finish_and_clear();
    }
}

//! Per-invocation discovery state.

use std::collections::{HashMap, HashSet};

use url::Url;

use contentmill_shared::{ContentMillError, Result};

/// State shared by the strategies of one orchestration call.
#[derive(Debug)]
pub struct DiscoverySession {
    base_url: String,
    base: Url,
    visited: HashSet<String>,
    attempts: HashMap<&'static str, u32>,
}

impl DiscoverySession {
    /// Start a session for `base_url`. A trailing `/` is dropped so that
    /// probe paths can be appended directly.
    pub fn new(base_url: &str) -> Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base = Url::parse(trimmed)
            .map_err(|e| ContentMillError::validation(format!("invalid base URL '{base_url}': {e}")))?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(ContentMillError::validation(format!(
                "unsupported scheme '{}' in {base_url}",
                base.scheme()
            )));
        }
        if base.host_str().is_none() {
            return Err(ContentMillError::validation(format!("{base_url} has no host")));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            base,
            visited: HashSet::new(),
            attempts: HashMap::new(),
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `base_url` + `suffix`, e.g. `join("/feed")`.
    pub fn join(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.base_url)
    }

    /// Record `url` as seen. Returns `false` if it was already visited.
    pub fn mark_visited(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn record_attempt(&mut self, strategy: &'static str) {
        *self.attempts.entry(strategy).or_default() += 1;
    }

    pub fn attempts(&self, strategy: &str) -> u32 {
        self.attempts.get(strategy).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let session = DiscoverySession::new("https://blog.test/").unwrap();
        assert_eq!(session.base_url(), "https://blog.test");
        assert_eq!(session.join("/feed"), "https://blog.test/feed");
    }

    #[test]
    fn rejects_unusable_urls() {
        assert!(DiscoverySession::new("not a url").is_err());
        assert!(DiscoverySession::new("ftp://blog.test").is_err());
    }

    #[test]
    fn visited_set_dedups() {
        let mut session = DiscoverySession::new("https://blog.test").unwrap();
        assert!(session.mark_visited("https://blog.test/blog/a"));
        assert!(!session.mark_visited("https://blog.test/blog/a"));
        assert_eq!(session.visited_count(), 1);
    }

    #[test]
    fn attempts_are_counted_per_strategy() {
        let mut session = DiscoverySession::new("https://blog.test").unwrap();
        session.record_attempt("feed");
        session.record_attempt("feed");
        assert_eq!(session.attempts("feed"), 2);
        assert_eq!(session.attempts("sitemap"), 0);
    }
}

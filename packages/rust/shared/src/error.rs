//! Error types for contentmill.
//!
//! Library crates use [`ContentMillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all contentmill operations.
#[derive(Debug, thiserror::Error)]
pub enum ContentMillError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Static HTTP fetch failed (network, timeout, or non-2xx status).
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Headless browser session failure.
    #[error("render error: {0}")]
    Render(String),

    /// Readability or markdown conversion failure.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Malformed feed or sitemap XML.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// PDF text extraction failure.
    #[error("pdf error: {0}")]
    Pdf(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid input (bad URL, zero chunk size, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The caller cancelled the running ingestion.
    #[error("operation cancelled")]
    Cancelled,
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ContentMillError>;

impl ContentMillError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error came from cancellation rather than a per-URL failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = ContentMillError::config("missing chromium path");
        assert_eq!(err.to_string(), "config error: missing chromium path");

        let err = ContentMillError::Fetch("https://example.com/feed: HTTP 404".into());
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn cancelled_is_distinguished() {
        assert!(ContentMillError::Cancelled.is_cancelled());
        assert!(!ContentMillError::Render("boom".into()).is_cancelled());
    }
}

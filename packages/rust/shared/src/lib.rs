//! Shared types, error model, and configuration for contentmill.
//!
//! This crate is the foundation depended on by all other contentmill crates.
//! It provides:
//! - [`ContentMillError`] — the unified error type
//! - Domain types ([`ContentItem`], [`ContentType`], [`IngestBatch`])
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], config loading)
//! - Progress reporting ([`ProgressReporter`])

pub mod config;
pub mod error;
pub mod progress;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_USER_AGENT, DefaultsConfig, FetchConfig, RenderConfig, ScrapeConfig,
    config_dir, config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{ContentMillError, Result};
pub use progress::{ProgressReporter, SilentProgress};
pub use types::{
    ContentItem, ContentType, DEFAULT_TEAM_ID, FixedTeamId, IngestBatch, TeamIdGenerator,
    UNTITLED, UuidTeamIds,
};

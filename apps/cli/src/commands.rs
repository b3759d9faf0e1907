//! CLI command definitions, routing, and tracing setup.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use contentmill_core::{Ingestor, ingest_pdfs};
use contentmill_shared::{
    AppConfig, DEFAULT_TEAM_ID, FixedTeamId, IngestBatch, ProgressReporter, ScrapeConfig,
    init_config, load_config, load_config_from,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::progress::CliProgress;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// contentmill — turn PDFs and blogs into knowledge items.
#[derive(Parser)]
#[command(
    name = "contentmill",
    version,
    about = "Ingest PDF books and blog posts into a uniform JSON knowledge format.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Never launch a headless browser; pages with script-built content
    /// keep an empty body.
    #[arg(long, global = true)]
    pub no_render: bool,

    /// Config file to use instead of ~/.contentmill/contentmill.toml.
    #[arg(long, global = true, env = "CONTENTMILL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Chunk PDF books into book items.
    Pdf {
        /// PDF files to ingest.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Characters per chunk.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Team id for the output batch.
        #[arg(long, default_value = DEFAULT_TEAM_ID)]
        team_id: String,
    },

    /// Discover and scrape every post of one or more blogs.
    Blog {
        /// Blog base URLs.
        #[arg(required = true)]
        urls: Vec<String>,

        /// Listing pages to crawl when no feed or sitemap is found.
        #[arg(long)]
        max_pages: Option<u32>,

        /// Team id for the output batch.
        #[arg(long, default_value = DEFAULT_TEAM_ID)]
        team_id: String,
    },

    /// Ingest PDFs and blogs together under a freshly generated team id.
    All {
        /// PDF file (repeatable).
        #[arg(long = "pdf")]
        pdfs: Vec<PathBuf>,

        /// Blog base URL (repeatable).
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Listing pages to crawl when no feed or sitemap is found.
        #[arg(long)]
        max_pages: Option<u32>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout
/// carries only the JSON batch.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "contentmill=info",
        1 => "contentmill=debug",
        _ => "contentmill=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let settings = Settings {
        config_path: cli.config,
        no_render: cli.no_render,
    };

    match cli.command {
        Command::Pdf {
            files,
            chunk_size,
            team_id,
        } => cmd_pdf(&settings, &files, chunk_size, team_id).await,
        Command::Blog {
            urls,
            max_pages,
            team_id,
        } => cmd_blog(&settings, &urls, max_pages, team_id).await,
        Command::All {
            pdfs,
            urls,
            max_pages,
        } => cmd_all(&settings, &pdfs, &urls, max_pages).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&settings).await,
        },
    }
}

/// Global flags that shape the runtime config.
struct Settings {
    config_path: Option<PathBuf>,
    no_render: bool,
}

impl Settings {
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config_path {
            Some(path) => load_config_from(path)?,
            None => load_config()?,
        };
        if self.no_render {
            config.render.enabled = false;
        }
        Ok(config)
    }

    fn scrape_config(&self) -> Result<ScrapeConfig> {
        Ok(ScrapeConfig::from(&self.app_config()?))
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_pdf(
    settings: &Settings,
    files: &[PathBuf],
    chunk_size: Option<usize>,
    team_id: String,
) -> Result<()> {
    let config = settings.scrape_config()?;
    let chunk_size = chunk_size.unwrap_or(config.chunk_size);
    if chunk_size == 0 {
        return Err(eyre!("--chunk-size must be greater than 0"));
    }

    let documents = read_documents(files).await?;
    info!(documents = documents.len(), chunk_size, "ingesting PDFs");

    let cancel = cancel_on_ctrl_c();
    let items = tokio::select! {
        items = ingest_pdfs(documents, chunk_size) => items,
        _ = cancel.cancelled() => return Err(eyre!("cancelled")),
    };

    print_batch(&IngestBatch { team_id, items })
}

async fn cmd_blog(
    settings: &Settings,
    urls: &[String],
    max_pages: Option<u32>,
    team_id: String,
) -> Result<()> {
    let mut config = settings.scrape_config()?;
    if let Some(max_pages) = max_pages {
        config.max_pages = max_pages;
    }
    info!(blogs = urls.len(), max_pages = config.max_pages, "ingesting blogs");

    let progress = Arc::new(CliProgress::new());
    let ingestor = Ingestor::from_config(config)?
        .with_team_ids(Box::new(FixedTeamId(team_id)))
        .with_cancellation(cancel_on_ctrl_c())
        .with_progress(progress.clone());

    let items = finish(&ingestor, progress.as_ref(), ingestor.ingest_blog_urls(urls)).await?;
    print_batch(&ingestor.batch(items))
}

async fn cmd_all(
    settings: &Settings,
    pdfs: &[PathBuf],
    urls: &[String],
    max_pages: Option<u32>,
) -> Result<()> {
    if pdfs.is_empty() && urls.is_empty() {
        return Err(eyre!("nothing to ingest: pass at least one --pdf or --url"));
    }

    let config = settings.scrape_config()?;
    let max_pages = max_pages.unwrap_or(config.max_pages);
    let documents = read_documents(pdfs).await?;

    let progress = Arc::new(CliProgress::new());
    let ingestor = Ingestor::from_config(config)?
        .with_cancellation(cancel_on_ctrl_c())
        .with_progress(progress.clone());

    let batch = finish(
        &ingestor,
        progress.as_ref(),
        ingestor.ingest_mixed(documents, urls, max_pages),
    )
    .await?;
    print_batch(&batch)
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    eprintln!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(settings: &Settings) -> Result<()> {
    let config = settings.app_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Await `work`, close the browser, and stop the spinner.
async fn finish<T, F>(ingestor: &Ingestor, progress: &dyn ProgressReporter, work: F) -> Result<T>
where
    F: Future<Output = contentmill_shared::Result<T>>,
    T: ItemCount,
{
    let result = ingestor.closing(work).await;
    progress.done(result.as_ref().map(ItemCount::item_count).unwrap_or(0));
    Ok(result?)
}

trait ItemCount {
    fn item_count(&self) -> usize;
}

impl ItemCount for Vec<contentmill_shared::ContentItem> {
    fn item_count(&self) -> usize {
        self.len()
    }
}

impl ItemCount for IngestBatch {
    fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// A token cancelled on the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            trigger.cancel();
        }
    });
    token
}

async fn read_documents(files: &[PathBuf]) -> Result<Vec<Vec<u8>>> {
    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        documents.push(read_document(path).await?);
    }
    Ok(documents)
}

async fn read_document(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .wrap_err_with(|| format!("failed to read {}", path.display()))
}

fn print_batch(batch: &IngestBatch) -> Result<()> {
    info!(team_id = %batch.team_id, items = batch.items.len(), "ingestion complete");
    println!("{}", serde_json::to_string_pretty(batch)?);
    Ok(())
}

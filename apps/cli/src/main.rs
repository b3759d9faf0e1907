//! contentmill CLI: turn PDFs and blogs into uniform knowledge items.
//!
//! Items are printed to stdout as a JSON batch; logs and progress go to
//! stderr.

mod commands;
mod progress;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}

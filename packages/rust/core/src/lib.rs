//! Ingestion orchestration for contentmill.
//!
//! Ties discovery, page scraping, and PDF chunking together into the
//! entry points used by the CLI: [`ingest_pdf`], [`ingest_pdfs`], and the
//! blog methods on [`Ingestor`].

pub mod ingest;
pub mod orchestrator;

pub use ingest::{Ingestor, ingest_pdf, ingest_pdfs};
pub use orchestrator::{Orchestrator, discover_all};

//! # pagelens
//!
//! Analyse multi-page documents page by page with Vision Language Models.
//!
//! ## Why this crate?
//!
//! Feeding a whole PDF to a text extractor loses layout, figures, and
//! anything scanned. pagelens instead treats each page as an image: the
//! document is uploaded once to a media store that exposes per-page
//! renderings, and a vision model reads every page the way a human would.
//! Pages are analysed in fixed-size concurrent batches with a cooldown
//! between batches, and the per-page outcomes are reassembled — in page
//! order, with explicit success/error accounting — into one combined
//! report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Document
//!  │
//!  ├─ 1. Rasterize  upload to the media store, derive per-page image URLs
//!  ├─ 2. Count      page-count query (degrades to an estimate on failure)
//!  ├─ 3. Dispatch   sequential groups of concurrent vision calls
//!  ├─ 4. Clean      deterministic cleanup of model output
//!  └─ 5. Aggregate  ordered combined report + success/error counts
//! ```
//!
//! A static image skips steps 1–2 entirely: it is inlined as a `data:` URI
//! and analysed as a one-page pseudo-document.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pagelens::{ingest, Document, IngestConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Collaborators auto-detected from CLOUDINARY_* / OPENAI_API_KEY
//!     let config = IngestConfig::default();
//!     let bytes = std::fs::read("report.pdf")?;
//!     let output = ingest(Document::new("report.pdf", "application/pdf", bytes), &config).await?;
//!     println!("{}", output.report.description);
//!     eprintln!(
//!         "{}/{} pages analysed",
//!         output.report.success_count, output.report.analyzed_pages
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Only the upload can fail an ingestion. Everything after it degrades:
//! a failed page-count query falls back to an estimate, a failed or
//! timed-out page becomes an error placeholder in the report, and even a
//! whole batch falling over only marks its own pages as failed. The caller
//! always receives a structured report once the document is stored.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pagelens` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pagelens = { version = "0.4", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod report;
pub mod retry;
pub mod store;
pub mod stream;
pub mod vision;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AnalysisMode, IngestConfig, IngestConfigBuilder, RenderOptions, Strategy};
pub use document::{Document, Page};
pub use error::{IngestError, PageError, StoreError, VisionError};
pub use ingest::ingest;
pub use progress::{IngestProgressCallback, NoopIngestCallback, ProgressCallback};
pub use report::{BatchReport, IngestOutput, IngestStats, PageResult};
pub use retry::RetryPolicy;
pub use store::{CloudinaryStore, MediaStore};
pub use stream::{ingest_stream, PageResultStream};
pub use vision::{OpenAiVision, VisionModel};

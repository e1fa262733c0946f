//! Streaming ingestion API: emit page results as each group settles.
//!
//! ## Why stream?
//!
//! Large documents take a while. A stream-based API lets callers display
//! partial results immediately, wire up progress UIs, or persist pages
//! incrementally instead of waiting for the whole report.
//!
//! Unlike the eager [`crate::ingest::ingest`] which returns only after
//! aggregation, [`ingest_stream`] yields each [`PageResult`] as soon as its
//! group has settled. Group semantics are identical to the eager path:
//! groups run strictly in sequence with the configured cooldown between
//! them, so results arrive in bursts of up to `chunk_size`. Within a burst
//! results are ordered by ordinal; callers that interleave multiple
//! documents should still sort by `ordinal()` before display.

use crate::config::{AnalysisMode, IngestConfig};
use crate::document::{Document, Page};
use crate::error::IngestError;
use crate::ingest::{build_tasks, resolve_store, resolve_vision, sample_pages};
use crate::pipeline::dispatch::{run_group, AnalysisTask};
use crate::pipeline::{postprocess, rasterize};
use crate::prompts;
use crate::report::PageResult;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_stream::Stream;
use tracing::info;

/// A boxed stream of page results.
pub type PageResultStream = Pin<Box<dyn Stream<Item = PageResult> + Send>>;

/// Ingest a document, streaming page results as groups complete.
///
/// # Returns
/// - `Ok(PageResultStream)` — yields exactly one [`PageResult`] per
///   submitted page; failures arrive as `Failure` placeholders, never as
///   stream errors.
/// - `Err(IngestError)` — fatal error before dispatch began (empty payload,
///   unsupported media type, upload rejection).
pub async fn ingest_stream(
    document: Document,
    config: &IngestConfig,
) -> Result<PageResultStream, IngestError> {
    info!("Starting streaming ingestion: '{}'", document.name);

    if document.bytes.is_empty() {
        return Err(IngestError::EmptyDocument {
            name: document.name,
        });
    }

    let vision = resolve_vision(config)?;

    // ── Build the task list (same front half as the eager path) ──────────
    let tasks: Vec<AnalysisTask> = if document.is_image() {
        let data_uri = format!(
            "data:{};base64,{}",
            document.media_type,
            STANDARD.encode(&document.bytes)
        );
        vec![AnalysisTask {
            page: Page {
                ordinal: 1,
                image_url: data_uri,
                asset_id: None,
            },
            prompt: config
                .prompt
                .clone()
                .unwrap_or_else(|| prompts::DEFAULT_SINGLE_IMAGE_PROMPT.to_string()),
            max_tokens: prompts::SINGLE_IMAGE_MAX_TOKENS,
        }]
    } else if document.is_paginated() {
        let store = resolve_store(config)?;
        let (pages, _) = rasterize::rasterize(&store, &document, config).await?;
        let total_pages = pages.len();
        let mode = config.strategy.mode_for(total_pages);
        let selected = match mode {
            AnalysisMode::Complete => pages,
            AnalysisMode::Sampling => sample_pages(&pages),
        };
        build_tasks(&selected, total_pages, mode, config)
    } else {
        return Err(IngestError::UnsupportedMediaType {
            name: document.name,
            media_type: document.media_type,
        });
    };

    // ── Build the stream: one burst per group, barrier between bursts ─────
    let total = tasks.len();
    let group_count = total.div_ceil(config.chunk_size);
    let groups: Vec<Vec<AnalysisTask>> = tasks
        .chunks(config.chunk_size)
        .map(|g| g.to_vec())
        .collect();
    let config = config.clone();

    let s = stream::iter(groups.into_iter().enumerate())
        .then(move |(index, group)| {
            let vision = Arc::clone(&vision);
            let config = config.clone();
            async move {
                if index > 0 {
                    sleep(config.group_delay()).await;
                }
                if let Some(ref cb) = config.progress_callback {
                    cb.on_group_start(index + 1, group_count);
                }
                run_group(&vision, group, total, &config).await
            }
        })
        .map(stream::iter)
        .flatten()
        .map(|result| match result {
            PageResult::Success { ordinal, text } => PageResult::Success {
                ordinal,
                text: postprocess::clean_analysis(&text),
            },
            failure => failure,
        });

    Ok(Box::pin(s))
}

//! End-to-end ingestion: the orchestrator driving every pipeline stage.
//!
//! ## Failure containment
//!
//! The run moves through Received → Rasterizing → Counting → Dispatching →
//! Aggregating → Done. Only the rasterising stage can fail the whole run
//! (the store rejected the upload); from dispatching onward every failure
//! degrades to a per-page placeholder, so the caller always gets a
//! structured report once the upload has succeeded — even if every single
//! page failed.
//!
//! ## Single-image short-circuit
//!
//! A static image has no pagination, so the rasteriser and page counter
//! are skipped entirely: the bytes are inlined as a `data:` URI and
//! submitted as one analysis task.

use crate::config::{AnalysisMode, IngestConfig};
use crate::document::{Document, Page};
use crate::error::IngestError;
use crate::pipeline::dispatch::{self, AnalysisTask};
use crate::pipeline::{aggregate, postprocess, rasterize};
use crate::prompts;
use crate::report::{IngestOutput, IngestStats, PageResult};
use crate::store::{CloudinaryStore, MediaStore};
use crate::vision::{OpenAiVision, VisionModel};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Ingest a document and return the combined analysis report.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(IngestOutput)` once the upload has succeeded, even if some or all
/// pages failed (check `report.error_count`).
///
/// # Errors
/// Returns `Err(IngestError)` only for fatal errors:
/// - Empty payload or unsupported media type
/// - The media store rejected the upload
/// - No collaborator configured and none could be built from the environment
pub async fn ingest(
    document: Document,
    config: &IngestConfig,
) -> Result<IngestOutput, IngestError> {
    let total_start = Instant::now();
    info!(
        "Starting ingestion: '{}' ({} bytes, {})",
        document.name,
        document.size(),
        document.media_type
    );

    if document.bytes.is_empty() {
        return Err(IngestError::EmptyDocument {
            name: document.name,
        });
    }

    // ── Step 1: Resolve the vision collaborator ──────────────────────────
    let vision = resolve_vision(config)?;

    // ── Step 2: Route by media type ──────────────────────────────────────
    if document.is_image() {
        return ingest_single_image(document, &vision, config, total_start).await;
    }
    if !document.is_paginated() {
        return Err(IngestError::UnsupportedMediaType {
            name: document.name,
            media_type: document.media_type,
        });
    }
    let store = resolve_store(config)?;

    // ── Step 3: Rasterise (upload + count + page URLs) ───────────────────
    let upload_start = Instant::now();
    let (pages, document_pages) = rasterize::rasterize(&store, &document, config).await?;
    let upload_duration_ms = upload_start.elapsed().as_millis() as u64;
    // Only derived artifacts persist past this point.
    drop(document);
    let total_pages = pages.len();

    // ── Step 4: Resolve the analysis strategy ────────────────────────────
    let mode = config.strategy.mode_for(total_pages);
    let selected = match mode {
        AnalysisMode::Complete => pages,
        AnalysisMode::Sampling => {
            let sampled = sample_pages(&pages);
            info!(
                "Sampling {} key pages out of {}",
                sampled.len(),
                total_pages
            );
            sampled
        }
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_ingest_start(selected.len());
    }
    let tasks = build_tasks(&selected, total_pages, mode, config);
    debug!("Built {} analysis tasks", tasks.len());

    // ── Step 5: Dispatch in batched groups ───────────────────────────────
    let dispatch_start = Instant::now();
    let results = dispatch::dispatch(&vision, &tasks, config).await;
    let dispatch_duration_ms = dispatch_start.elapsed().as_millis() as u64;

    // ── Step 6: Clean up and aggregate ───────────────────────────────────
    let results = clean_results(results);
    let report = aggregate::aggregate(results, total_pages, mode);

    info!(
        "Ingestion complete: {}/{} pages analysed, {}ms total",
        report.success_count,
        report.analyzed_pages,
        total_start.elapsed().as_millis()
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_ingest_complete(report.analyzed_pages, report.success_count);
    }

    let stats = IngestStats {
        document_pages,
        total_pages,
        analyzed_pages: report.analyzed_pages,
        failed_pages: report.error_count,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        upload_duration_ms,
        dispatch_duration_ms,
    };

    Ok(IngestOutput { report, stats })
}

/// Ingest a static image as a one-page pseudo-document.
///
/// The image never touches the media store: its bytes are inlined as a
/// `data:` URI and analysed directly.
async fn ingest_single_image(
    document: Document,
    vision: &Arc<dyn VisionModel>,
    config: &IngestConfig,
    total_start: Instant,
) -> Result<IngestOutput, IngestError> {
    info!("Single image '{}': skipping rasterisation", document.name);

    let data_uri = format!(
        "data:{};base64,{}",
        document.media_type,
        STANDARD.encode(&document.bytes)
    );
    let page = Page {
        ordinal: 1,
        image_url: data_uri,
        asset_id: None,
    };
    let prompt = config
        .prompt
        .clone()
        .unwrap_or_else(|| prompts::DEFAULT_SINGLE_IMAGE_PROMPT.to_string());
    let tasks = vec![AnalysisTask {
        page,
        prompt,
        max_tokens: prompts::SINGLE_IMAGE_MAX_TOKENS,
    }];

    if let Some(ref cb) = config.progress_callback {
        cb.on_ingest_start(1);
    }

    let dispatch_start = Instant::now();
    let results = dispatch::dispatch(vision, &tasks, config).await;
    let dispatch_duration_ms = dispatch_start.elapsed().as_millis() as u64;

    let results = clean_results(results);
    let report = aggregate::aggregate(results, 1, AnalysisMode::Complete);

    if let Some(ref cb) = config.progress_callback {
        cb.on_ingest_complete(1, report.success_count);
    }

    let stats = IngestStats {
        document_pages: 1,
        total_pages: 1,
        analyzed_pages: 1,
        failed_pages: report.error_count,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        upload_duration_ms: 0,
        dispatch_duration_ms,
    };

    Ok(IngestOutput { report, stats })
}

/// Pair each selected page with its rendered prompt and token budget.
pub(crate) fn build_tasks(
    pages: &[Page],
    total_pages: usize,
    mode: AnalysisMode,
    config: &IngestConfig,
) -> Vec<AnalysisTask> {
    pages
        .iter()
        .map(|page| AnalysisTask {
            page: page.clone(),
            prompt: prompts::page_prompt(
                page.ordinal,
                total_pages,
                mode,
                config.prompt.as_deref(),
            ),
            max_tokens: prompts::max_tokens_for(mode),
        })
        .collect()
}

/// Select the key pages for sampling mode: first page, every third
/// interior page, last page.
pub(crate) fn sample_pages(pages: &[Page]) -> Vec<Page> {
    let len = pages.len();
    if len <= 1 {
        return pages.to_vec();
    }

    let mut picked = vec![0usize];
    let mut i = 2;
    while i < len - 1 {
        picked.push(i);
        i += 3;
    }
    picked.push(len - 1);

    picked.into_iter().map(|i| pages[i].clone()).collect()
}

/// Run successful page text through the deterministic cleanup rules.
pub(crate) fn clean_results(results: Vec<PageResult>) -> Vec<PageResult> {
    results
        .into_iter()
        .map(|r| match r {
            PageResult::Success { ordinal, text } => PageResult::Success {
                ordinal,
                text: postprocess::clean_analysis(&text),
            },
            failure => failure,
        })
        .collect()
}

/// Resolve the media store, from most-specific to least-specific:
/// an injected instance wins, otherwise one is built from the environment.
pub(crate) fn resolve_store(config: &IngestConfig) -> Result<Arc<dyn MediaStore>, IngestError> {
    if let Some(ref store) = config.store {
        return Ok(Arc::clone(store));
    }
    let store = CloudinaryStore::from_env().map_err(|e| IngestError::StoreNotConfigured {
        hint: format!(
            "Set CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY, and CLOUDINARY_API_SECRET,\n\
             or inject a MediaStore via IngestConfig::builder().store(...).\n\
             Error: {e}"
        ),
    })?;
    Ok(Arc::new(store))
}

/// Resolve the vision model the same way: injection wins over environment.
pub(crate) fn resolve_vision(config: &IngestConfig) -> Result<Arc<dyn VisionModel>, IngestError> {
    if let Some(ref vision) = config.vision {
        return Ok(Arc::clone(vision));
    }
    let vision = OpenAiVision::from_env().map_err(|e| IngestError::VisionNotConfigured {
        hint: format!(
            "Set OPENAI_API_KEY (and optionally PAGELENS_MODEL),\n\
             or inject a VisionModel via IngestConfig::builder().vision(...).\n\
             Error: {e}"
        ),
    })?;
    Ok(Arc::new(vision))
}

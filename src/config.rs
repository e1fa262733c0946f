//! Configuration types for document ingestion.
//!
//! All pipeline behaviour is controlled through [`IngestConfig`], built via
//! its [`IngestConfigBuilder`] and passed into the orchestrator at the call
//! site. Keeping every knob in one explicit value (rather than ambient
//! globals) makes it trivial to share configs across tasks, serialise the
//! plain fields for logging, and diff two runs to understand why their
//! reports differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely
//! on well-documented defaults for the rest.

use crate::error::IngestError;
use crate::progress::ProgressCallback;
use crate::retry::RetryPolicy;
use crate::store::MediaStore;
use crate::vision::VisionModel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for one document ingestion.
///
/// Built via [`IngestConfig::builder()`] or using
/// [`IngestConfig::default()`].
///
/// # Example
/// ```rust
/// use pagelens::IngestConfig;
///
/// let config = IngestConfig::builder()
///     .chunk_size(5)
///     .page_ceiling(20)
///     .task_timeout_secs(60)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct IngestConfig {
    /// Number of pages submitted to the vision model concurrently per group. Default: 5.
    ///
    /// Groups run strictly in sequence; only the pages inside one group are
    /// in flight at once. Smaller values reduce burstiness against provider
    /// rate limits, larger values reduce total wall-clock latency.
    pub chunk_size: usize,

    /// Cooldown inserted before every group except the first, in milliseconds. Default: 1000.
    ///
    /// Applied `ceil(pages / chunk_size) - 1` times per document, keeping
    /// sustained request rates under typical provider limits.
    pub group_delay_ms: u64,

    /// Maximum number of pages rasterised per document. Default: 20.
    ///
    /// Documents beyond the ceiling still ingest, but only the first
    /// `ceiling` pages are rendered and analysed. This bounds cost for
    /// arbitrarily long uploads; it is a deployment constant, never
    /// user-supplied.
    pub page_ceiling: usize,

    /// Page-count estimate used when the store's count query fails. Default: 5.
    ///
    /// An approximate count only affects how many render URLs are issued,
    /// not the correctness of results already obtained, so a failed query
    /// degrades to this estimate instead of failing the ingestion.
    pub fallback_page_count: usize,

    /// Per-page analysis timeout in seconds. Default: 60.
    ///
    /// Wraps the entire retried call, so a page can never hold its group
    /// open longer than this regardless of the retry budget. An expired
    /// page becomes a `Failure` placeholder; its siblings are unaffected.
    pub task_timeout_secs: u64,

    /// Maximum retry attempts on a transient collaborator failure. Default: 3.
    ///
    /// Applies uniformly at every network boundary (upload and per-page
    /// analysis) through one shared [`RetryPolicy`].
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s.
    pub retry_backoff_ms: u64,

    /// Analysis strategy. Default: [`Strategy::Complete`].
    pub strategy: Strategy,

    /// Caller-supplied prompt appended to the per-page instruction,
    /// and used verbatim for single-image ingestion. Default: None.
    pub prompt: Option<String>,

    /// Rendering parameters the media store applies per page.
    pub render: RenderOptions,

    /// Store folder prefix for uploaded assets. Default: "pagelens".
    pub folder: String,

    /// Pre-constructed media store. If None, built from the environment.
    pub store: Option<Arc<dyn MediaStore>>,

    /// Pre-constructed vision model. Takes precedence over environment
    /// auto-detection; this is also the injection point for test doubles.
    pub vision: Option<Arc<dyn VisionModel>>,

    /// Progress callback for per-page and per-group events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: 5,
            group_delay_ms: 1000,
            page_ceiling: 20,
            fallback_page_count: 5,
            task_timeout_secs: 60,
            max_retries: 3,
            retry_backoff_ms: 500,
            strategy: Strategy::default(),
            prompt: None,
            render: RenderOptions::default(),
            folder: "pagelens".to_string(),
            store: None,
            vision: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("chunk_size", &self.chunk_size)
            .field("group_delay_ms", &self.group_delay_ms)
            .field("page_ceiling", &self.page_ceiling)
            .field("fallback_page_count", &self.fallback_page_count)
            .field("task_timeout_secs", &self.task_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("strategy", &self.strategy)
            .field("prompt", &self.prompt)
            .field("render", &self.render)
            .field("folder", &self.folder)
            .field("store", &self.store.as_ref().map(|_| "<dyn MediaStore>"))
            .field("vision", &self.vision.as_ref().map(|_| "<dyn VisionModel>"))
            .finish()
    }
}

impl IngestConfig {
    /// Create a new builder for `IngestConfig`.
    pub fn builder() -> IngestConfigBuilder {
        IngestConfigBuilder {
            config: Self::default(),
        }
    }

    /// The retry policy shared by every network boundary in the pipeline.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.retry_backoff_ms),
        )
    }

    /// Per-task timeout as a [`Duration`].
    pub fn task_timeout(&self) -> Duration {
        Duration::from_secs(self.task_timeout_secs)
    }

    /// Inter-group cooldown as a [`Duration`].
    pub fn group_delay(&self) -> Duration {
        Duration::from_millis(self.group_delay_ms)
    }
}

/// Builder for [`IngestConfig`].
#[derive(Debug)]
pub struct IngestConfigBuilder {
    config: IngestConfig,
}

impl IngestConfigBuilder {
    pub fn chunk_size(mut self, n: usize) -> Self {
        self.config.chunk_size = n.max(1);
        self
    }

    pub fn group_delay_ms(mut self, ms: u64) -> Self {
        self.config.group_delay_ms = ms;
        self
    }

    pub fn page_ceiling(mut self, n: usize) -> Self {
        self.config.page_ceiling = n.max(1);
        self
    }

    pub fn fallback_page_count(mut self, n: usize) -> Self {
        self.config.fallback_page_count = n.max(1);
        self
    }

    pub fn task_timeout_secs(mut self, secs: u64) -> Self {
        self.config.task_timeout_secs = secs.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn render(mut self, render: RenderOptions) -> Self {
        self.config.render = render;
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.config.folder = folder.into();
        self
    }

    pub fn store(mut self, store: Arc<dyn MediaStore>) -> Self {
        self.config.store = Some(store);
        self
    }

    pub fn vision(mut self, vision: Arc<dyn VisionModel>) -> Self {
        self.config.vision = Some(vision);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<IngestConfig, IngestError> {
        let c = &self.config;
        if c.chunk_size == 0 {
            return Err(IngestError::InvalidConfig("Chunk size must be ≥ 1".into()));
        }
        if c.page_ceiling == 0 {
            return Err(IngestError::InvalidConfig(
                "Page ceiling must be ≥ 1".into(),
            ));
        }
        if c.task_timeout_secs == 0 {
            return Err(IngestError::InvalidConfig(
                "Task timeout must be ≥ 1s".into(),
            ));
        }
        if let Strategy::Sampling { threshold } = c.strategy {
            if threshold == 0 {
                return Err(IngestError::InvalidConfig(
                    "Sampling threshold must be ≥ 1".into(),
                ));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which pages of a document get analysed.
///
/// `Complete` is the canonical behaviour: every rasterised page is
/// submitted, chunked and concurrent. `Sampling` is the alternative policy
/// for very large documents — above the threshold only key pages (first,
/// every third interior page, last) are analysed, trading coverage for
/// latency and cost. It is a configuration choice, not hardwired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Analyse every rasterised page (default).
    Complete,
    /// Sample key pages once the page list exceeds `threshold`.
    Sampling { threshold: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Complete
    }
}

impl Strategy {
    /// The default sampling threshold used by [`Strategy::sampling`].
    pub const DEFAULT_SAMPLING_THRESHOLD: usize = 25;

    /// Sampling with the default threshold.
    pub fn sampling() -> Self {
        Strategy::Sampling {
            threshold: Self::DEFAULT_SAMPLING_THRESHOLD,
        }
    }

    /// Resolve the effective analysis mode for a document of `total_pages`.
    pub fn mode_for(&self, total_pages: usize) -> AnalysisMode {
        match self {
            Strategy::Complete => AnalysisMode::Complete,
            Strategy::Sampling { threshold } if total_pages > *threshold => {
                AnalysisMode::Sampling
            }
            Strategy::Sampling { .. } => AnalysisMode::Complete,
        }
    }
}

/// The analysis mode actually applied to one document, after the
/// [`Strategy`] threshold has been resolved against its page count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    Complete,
    Sampling,
}

impl AnalysisMode {
    /// The wire label used in the report JSON (`"complete"` / `"sampling"`).
    pub fn label(&self) -> &'static str {
        match self {
            AnalysisMode::Complete => "complete",
            AnalysisMode::Sampling => "sampling",
        }
    }
}

/// Per-page rendering parameters passed to the media store.
///
/// The store scales each page to fit inside `width × height` without
/// upscaling, encodes it in `format` at the given quality tier, and applies
/// the device-pixel-ratio multiplier so small print stays legible to the
/// vision model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Target image format. Default: "jpg" (lossy, "high" quality tier).
    pub format: String,
    /// Maximum rendered width in pixels. Default: 1200.
    pub width: u32,
    /// Maximum rendered height in pixels. Default: 1600.
    pub height: u32,
    /// Store-side quality tier. Default: "auto:best".
    pub quality: String,
    /// Device pixel ratio multiplier. Default: "2.0".
    pub dpr: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: "jpg".to_string(),
            width: 1200,
            height: 1600,
            quality: "auto:best".to_string(),
            dpr: "2.0".to_string(),
        }
    }
}

//! CLI binary for pagelens.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `IngestConfig` and prints the combined report.

use anyhow::{Context, Result};
use clap::Parser;
use pagelens::{
    ingest, Document, IngestConfig, IngestProgressCallback, ProgressCallback, Strategy,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-page log
/// lines using [indicatif]. Pages inside a group complete out of order, so
/// every handler must be safe to call concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Create a callback whose progress-bar length is set dynamically by
    /// `on_ingest_start` (called once the page count is known).
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Uploading document…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl IngestProgressCallback for CliProgressCallback {
    fn on_ingest_start(&self, analyzed_pages: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(analyzed_pages as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Analysing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Analysing {analyzed_pages} pages…"))
        ));
    }

    fn on_group_start(&self, group: usize, group_count: usize) {
        self.bar.set_message(format!("group {group}/{group_count}"));
    }

    fn on_page_complete(&self, ordinal: usize, total: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            ordinal,
            total,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, ordinal: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}…")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            ordinal,
            total,
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_ingest_complete(&self, total: usize, success_count: usize) {
        let failed = total.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages analysed successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages analysed  ({} failed)",
                if failed == total { red("✘") } else { cyan("⚠") },
                bold(&success_count.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyse a PDF, print the combined report
  pagelens report.pdf

  # Analyse a single image with a custom question
  pagelens chart.png --prompt "What trend does this chart show?"

  # Structured JSON for the calling application
  pagelens report.pdf --json > report.json

  # Tune batching against provider rate limits
  pagelens big.pdf --chunk-size 3 --group-delay-ms 2000

  # Sample key pages of very large documents
  pagelens big.pdf --strategy sampling

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY              Vision model API key (required)
  PAGELENS_MODEL              Vision model id (default: gpt-4o)
  CLOUDINARY_CLOUD_NAME       Media store cloud name (required for PDFs)
  CLOUDINARY_API_KEY          Media store API key
  CLOUDINARY_API_SECRET       Media store API secret
  CLOUDINARY_UPLOAD_PRESET    Unsigned upload preset (default: ml_default)

SETUP:
  1. Set keys:    export OPENAI_API_KEY=sk-...  CLOUDINARY_CLOUD_NAME=...
  2. Analyse:     pagelens document.pdf
"#;

/// Analyse multi-page documents page by page with Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pagelens",
    version,
    about = "Analyse multi-page documents page by page with Vision LLMs",
    long_about = "Upload a document to a media store, analyse each page with a vision language \
model in batched concurrent calls, and print one ordered combined report with per-page \
success/error accounting. Single images skip the store and are analysed inline.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local document: a PDF or a single image (png, jpg, gif, webp).
    input: PathBuf,

    /// Extra instruction appended to every per-page prompt
    /// (used verbatim for single images).
    #[arg(short, long, env = "PAGELENS_PROMPT")]
    prompt: Option<String>,

    /// Pages analysed concurrently per group.
    #[arg(long, env = "PAGELENS_CHUNK_SIZE", default_value_t = 5)]
    chunk_size: usize,

    /// Cooldown between groups in milliseconds.
    #[arg(long, env = "PAGELENS_GROUP_DELAY_MS", default_value_t = 1000)]
    group_delay_ms: u64,

    /// Maximum pages rasterised per document.
    #[arg(long, env = "PAGELENS_MAX_PAGES", default_value_t = 20)]
    max_pages: usize,

    /// Per-page analysis timeout in seconds.
    #[arg(long, env = "PAGELENS_TASK_TIMEOUT", default_value_t = 60)]
    task_timeout: u64,

    /// Retries per network call on transient failure.
    #[arg(long, env = "PAGELENS_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Analysis strategy: complete, or sampling for very large documents.
    #[arg(long, env = "PAGELENS_STRATEGY", value_enum, default_value = "complete")]
    strategy: StrategyArg,

    /// Page count above which sampling mode samples key pages.
    #[arg(long, env = "PAGELENS_SAMPLING_THRESHOLD", default_value_t = 25)]
    sampling_threshold: usize,

    /// Vision model id (e.g. gpt-4o).
    #[arg(long, env = "PAGELENS_MODEL")]
    model: Option<String>,

    /// Media store folder prefix for uploaded assets.
    #[arg(long, env = "PAGELENS_FOLDER", default_value = "pagelens")]
    folder: String,

    /// Output the structured report as JSON instead of text.
    #[arg(long, env = "PAGELENS_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "PAGELENS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAGELENS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report itself.
    #[arg(short, long, env = "PAGELENS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum StrategyArg {
    Complete,
    Sampling,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Load the document ────────────────────────────────────────────────
    let media_type = media_type_for(&cli.input).with_context(|| {
        format!(
            "Cannot infer a supported media type from '{}' (expected .pdf, .png, .jpg, .jpeg, .gif, or .webp)",
            cli.input.display()
        )
    })?;
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read '{}'", cli.input.display()))?;
    let name = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let document = Document::new(name, media_type, bytes);

    // ── Build config and run ─────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn IngestProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let output = ingest(document, &config).await.context("Ingestion failed")?;

    // ── Print results ────────────────────────────────────────────────────
    if cli.json {
        let json =
            serde_json::to_string_pretty(&output.report).context("Failed to serialise report")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.report.description.as_bytes())
            .context("Failed to write to stdout")?;
        handle.write_all(b"\n").ok();
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Analysed {}/{} pages in {}ms",
            output.report.success_count,
            output.report.analyzed_pages,
            output.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Map CLI args to `IngestConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<IngestConfig> {
    let strategy = match cli.strategy {
        StrategyArg::Complete => Strategy::Complete,
        StrategyArg::Sampling => Strategy::Sampling {
            threshold: cli.sampling_threshold,
        },
    };

    let mut builder = IngestConfig::builder()
        .chunk_size(cli.chunk_size)
        .group_delay_ms(cli.group_delay_ms)
        .page_ceiling(cli.max_pages)
        .task_timeout_secs(cli.task_timeout)
        .max_retries(cli.max_retries)
        .strategy(strategy)
        .folder(cli.folder.clone());

    if let Some(ref prompt) = cli.prompt {
        builder = builder.prompt(prompt.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    if let Some(ref model) = cli.model {
        let key = std::env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY must be set when --model is given")?;
        builder = builder.vision(Arc::new(pagelens::OpenAiVision::new(key, model.clone())));
    }

    builder.build().context("Invalid configuration")
}

/// Infer the declared media type from the file extension.
fn media_type_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let media_type = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(media_type.to_string())
}

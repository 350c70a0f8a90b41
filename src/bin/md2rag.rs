//! CLI binary for md2rag.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `BundleConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use md2rag::{
    bundle, write_document, BundleConfig, BundleProgressCallback, ProgressCallback,
};
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

/// Terminal progress callback: renders a live progress bar and per-file log
/// lines using [indicatif]. Designed to work correctly when files complete
/// out-of-order (concurrent workers).
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Discovering documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl BundleProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_files: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_files as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
        self.bar.reset_eta();
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_files} documentation files…"))
        ));
    }

    fn on_file_start(&self, path: &Path, _total: usize) {
        self.bar.set_message(path.display().to_string());
    }

    fn on_file_complete(&self, path: &Path, _total: usize, output_len: usize) {
        self.bar.println(format!(
            "  {} {}  {}",
            green("✓"),
            path.display(),
            dim(&format!("{output_len:>6} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, path: &Path, _total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);

        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            let head: String = error.chars().take(79).collect();
            format!("{head}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar
            .println(format!("  {} {}  {}", red("✗"), path.display(), red(&msg)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_files: usize, success_count: usize) {
        let failed = total_files.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} files bundled successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} files bundled  ({} failed)",
                if failed == total_files {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Bundle a docs tree into processed_content.md
  md2rag docs/

  # Choose output file and media directory
  md2rag docs/ -o bundle.md --media-dir assets/

  # Resolve absolute image references against a site root
  md2rag docs/ --docs-root site/

  # Tune the captioning quota
  md2rag docs/ --rate-limit 5 --burst-limit 15 --model gpt-4o-mini

  # Point at an OpenAI-compatible gateway
  md2rag docs/ --api-endpoint http://localhost:11434/v1/chat/completions

  # JSON output with per-file records
  md2rag docs/ --json -o bundle.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY    API credential for the captioning service
  MD2RAG_MODEL      Override the vision model ID

SETUP:
  1. Set API key:   export OPENAI_API_KEY=sk-...
  2. Bundle:        md2rag docs/ -o bundle.md
"#;

/// Bundle Markdown/MDX documentation into one retrieval-ready document.
#[derive(Parser, Debug)]
#[command(
    name = "md2rag",
    version,
    about = "Bundle Markdown/MDX documentation into one retrieval-ready document",
    long_about = "Bundle a tree of Markdown/MDX documentation files into a single combined \
document. Local images are optimized into a hash-named media store and described by a \
Vision Language Model; captioning calls are throttled by a shared token-bucket rate limiter.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the documentation tree.
    input: PathBuf,

    /// Write the combined document to this file.
    #[arg(short, long, env = "MD2RAG_OUTPUT", default_value = "processed_content.md")]
    output: PathBuf,

    /// Directory for storing optimized media files.
    #[arg(long, env = "MD2RAG_MEDIA_DIR", default_value = "media_storage")]
    media_dir: PathBuf,

    /// Documentation root for resolving absolute image references.
    #[arg(long, env = "MD2RAG_DOCS_ROOT")]
    docs_root: Option<PathBuf>,

    /// API credential for the captioning service.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible completions endpoint override.
    #[arg(long, env = "MD2RAG_API_ENDPOINT")]
    api_endpoint: Option<String>,

    /// Vision model used for image descriptions.
    #[arg(long, env = "MD2RAG_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Number of documents processed in parallel.
    #[arg(short, long, env = "MD2RAG_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Maximum stored image size in bytes.
    #[arg(long, env = "MD2RAG_IMAGE_SIZE_LIMIT", default_value_t = 20 * 1024 * 1024)]
    image_size_limit: u64,

    /// Captioning requests allowed per second.
    #[arg(long, env = "MD2RAG_RATE_LIMIT", default_value_t = 10.0)]
    rate_limit: f64,

    /// Maximum captioning-request burst.
    #[arg(long, env = "MD2RAG_BURST_LIMIT", default_value_t = 30.0)]
    burst_limit: f64,

    /// Output structured JSON (BundleOutput) instead of the combined text.
    #[arg(long, env = "MD2RAG_JSON")]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "MD2RAG_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2RAG_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2RAG_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BundleProgressCallback>)
    } else {
        None
    };

    let mut builder = BundleConfig::builder()
        .media_dir(&cli.media_dir)
        .concurrency(cli.concurrency)
        .image_size_limit(cli.image_size_limit)
        .rate_limit(cli.rate_limit)
        .burst_limit(cli.burst_limit)
        .model(&cli.model);

    if let Some(ref root) = cli.docs_root {
        builder = builder.docs_root(root);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref endpoint) = cli.api_endpoint {
        builder = builder.api_endpoint(endpoint);
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;

    // ── Run ──────────────────────────────────────────────────────────────
    // Keep the output write separate from the run so the summary still
    // reaches the user when only the write fails.
    let output = match bundle(&cli.input, &config).await {
        Ok(output) => output,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{} No summary available: the run aborted before processing.", red("✘"));
            }
            return Err(e).context("Bundling failed");
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        let write_result = if cli.output.as_os_str() == "-" {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(json.as_bytes())
                .and_then(|_| handle.write_all(b"\n"))
                .context("stdout write")
        } else {
            tokio::fs::write(&cli.output, &json)
                .await
                .with_context(|| format!("Failed to write {}", cli.output.display()))
        };
        if !cli.quiet {
            eprint!("{}", output.stats.summary());
        }
        return write_result;
    }

    let write_result = write_document(&cli.output, &output.document).await;
    let stats = &output.stats;

    if !cli.quiet {
        eprintln!(
            "{}  {}/{} files  {}ms  →  {}",
            if stats.errors.is_empty() && write_result.is_ok() {
                green("✔")
            } else {
                cyan("⚠")
            },
            stats.processed_files,
            stats.total_files,
            stats.total_duration_ms,
            bold(&cli.output.display().to_string()),
        );
        eprint!("{}", dim(&stats.summary()));
    }

    write_result.context("Failed to write output")?;
    Ok(())
}

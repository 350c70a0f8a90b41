//! Top-level bundling entry points.
//!
//! [`bundle`] discovers every Markdown/MDX document under a root, fans the
//! files out across a bounded worker pool, and assembles the survivors into
//! one combined document headed by a run summary. Individual file failures
//! are recorded and skipped; only discovery and configuration problems abort
//! the run.

use crate::caption::{CaptionGenerator, CaptionProvider, OpenAiCaptioner};
use crate::config::BundleConfig;
use crate::error::Md2RagError;
use crate::limiter::RateLimiter;
use crate::output::{BundleOutput, FileResult, RunStats};
use crate::pipeline::{discover, file, images::ImageRewriter, store::MediaStore};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// Separator between per-file blocks in the combined document.
pub const FILE_SEPARATOR: &str = "\n\n---\n\n";

/// Bundle every `.md`/`.mdx` document under `root` into one combined,
/// retrieval-ready text.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(BundleOutput)` on success, even if some files failed
/// (check `output.stats.errors`).
///
/// # Errors
/// Returns `Err(Md2RagError)` only for fatal errors:
/// - No matching files found
/// - No caption provider configured
/// - Media directory cannot be created
pub async fn bundle(
    root: impl AsRef<Path>,
    config: &BundleConfig,
) -> Result<BundleOutput, Md2RagError> {
    let total_start = Instant::now();
    let root = root.as_ref();
    info!("Starting bundle run: {}", root.display());

    // ── Step 1: Discover documents ───────────────────────────────────────
    let files = discover::find_documents(root)?;
    let total_files = files.len();

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(total_files);
    }

    // ── Step 2: Build the shared per-image pipeline ──────────────────────
    let store = MediaStore::create(&config.media_dir)?;
    let captioner = resolve_captioner(config, std::env::var("OPENAI_API_KEY").ok())?;
    let limiter = Arc::new(RateLimiter::new(config.rate_limit, config.burst_limit)?);
    let rewriter = Arc::new(ImageRewriter::new(
        store,
        CaptionGenerator::new(captioner, limiter),
        config.docs_root.clone(),
        config.image_size_limit,
    ));

    // ── Step 3: Fan files out across the worker pool ─────────────────────
    let results: Vec<FileResult> = stream::iter(files.into_iter().map(|path| {
        let rewriter = Arc::clone(&rewriter);
        let config = config.clone();
        async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_start(&path, total_files);
            }
            let result = file::process_file(&path, &rewriter).await;
            if let Some(ref cb) = config.progress_callback {
                match &result.error {
                    None => cb.on_file_complete(&path, total_files, result.text.len()),
                    Some(e) => cb.on_file_error(&path, total_files, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    // ── Step 4: Merge stats from the per-worker records ──────────────────
    let mut stats = RunStats {
        total_files,
        ..RunStats::default()
    };
    for result in &results {
        match &result.error {
            None => {
                stats.processed_files += 1;
                stats.total_images += result.images_found;
                stats.processed_images += result.images_processed;
            }
            Some(e) => {
                error!("{e}");
                stats.errors.push(e.to_string());
            }
        }
    }
    stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    // ── Step 5: Assemble the combined document ───────────────────────────
    let document = assemble_document(&results, &stats);

    info!(
        "Bundle complete: {}/{} files, {} images, {}ms",
        stats.processed_files, stats.total_files, stats.processed_images, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total_files, stats.processed_files);
    }

    Ok(BundleOutput {
        document,
        files: results,
        stats,
    })
}

/// Bundle a tree and write the combined document directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial output.
pub async fn bundle_to_file(
    root: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &BundleConfig,
) -> Result<RunStats, Md2RagError> {
    let output = bundle(root, config).await?;
    write_document(output_path, &output.document).await?;
    Ok(output.stats)
}

/// Atomically write a combined document to `output_path` (temp file +
/// rename), creating parent directories as needed.
///
/// Separate from [`bundle_to_file`] so callers holding a [`BundleOutput`]
/// can still report its stats when only the write fails.
pub async fn write_document(
    output_path: impl AsRef<Path>,
    document: &str,
) -> Result<(), Md2RagError> {
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Md2RagError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, document)
        .await
        .map_err(|e| Md2RagError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Md2RagError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Synchronous wrapper around [`bundle`].
///
/// Creates a temporary tokio runtime internally.
pub fn bundle_sync(
    root: impl AsRef<Path>,
    config: &BundleConfig,
) -> Result<BundleOutput, Md2RagError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Md2RagError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(bundle(root, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the caption provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.captioner`) — the caller constructed
///    the provider entirely; we use it as-is. This is how tests inject a
///    stub and hosts inject custom middleware.
///
/// 2. **Explicit API key** (`config.api_key`) — an OpenAI-compatible
///    captioner is built for the configured model and endpoint.
///
/// 3. **Environment** (`OPENAI_API_KEY`) — same as 2, with the key read from
///    the execution environment. The lookup result is passed in rather than
///    read here, so resolution is testable without touching process state.
fn resolve_captioner(
    config: &BundleConfig,
    env_api_key: Option<String>,
) -> Result<Arc<dyn CaptionProvider>, Md2RagError> {
    if let Some(ref captioner) = config.captioner {
        return Ok(Arc::clone(captioner));
    }

    let key = config
        .api_key
        .clone()
        .or_else(|| env_api_key.filter(|k| !k.is_empty()));

    match key {
        Some(key) => {
            let mut captioner = OpenAiCaptioner::new(key, config.model.clone());
            if let Some(ref endpoint) = config.api_endpoint {
                captioner = captioner.with_endpoint(endpoint.clone());
            }
            Ok(Arc::new(captioner))
        }
        None => Err(Md2RagError::CaptionerNotConfigured {
            hint: "Set OPENAI_API_KEY, pass --api-key, or supply a CaptionProvider.".to_string(),
        }),
    }
}

/// Assemble the final combined document from the per-file results.
///
/// Successful outputs are sorted lexicographically by their rendered text —
/// not by source path — so the combined document is stable across runs and
/// worker orderings. The run summary heads the document as an HTML comment,
/// and blocks are joined with the fixed separator.
fn assemble_document(results: &[FileResult], stats: &RunStats) -> String {
    let mut blocks: Vec<&str> = results
        .iter()
        .filter(|r| r.error.is_none())
        .map(|r| r.text.as_str())
        .collect();
    blocks.sort_unstable();

    let mut parts = Vec::with_capacity(blocks.len() + 1);
    let summary = format!("<!-- {} -->", stats.summary());
    parts.push(summary.as_str());
    parts.extend(blocks);

    parts.join(FILE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn result(text: &str) -> FileResult {
        FileResult {
            path: PathBuf::from("x.md"),
            text: text.to_string(),
            images_found: 0,
            images_processed: 0,
            duration_ms: 0,
            error: None,
        }
    }

    #[test]
    fn assemble_sorts_by_rendered_text() {
        let results = vec![result("zebra"), result("alpha")];
        let stats = RunStats::default();
        let doc = assemble_document(&results, &stats);

        let alpha = doc.find("alpha").unwrap();
        let zebra = doc.find("zebra").unwrap();
        assert!(alpha < zebra);
        assert!(doc.starts_with("<!-- "));
        assert!(doc.contains(FILE_SEPARATOR));
    }

    #[test]
    fn assemble_excludes_failed_files() {
        let mut failed = result("should not appear");
        failed.error = Some(crate::error::FileError::Processing {
            path: PathBuf::from("x.md"),
            detail: "boom".into(),
        });
        let results = vec![result("alpha"), failed];
        let doc = assemble_document(&results, &RunStats::default());
        assert!(!doc.contains("should not appear"));
        assert!(doc.contains("alpha"));
    }

    #[test]
    fn captioner_resolution_prefers_prebuilt() {
        use crate::caption::CaptionProvider;
        use crate::error::CaptionError;
        use async_trait::async_trait;

        #[derive(Debug)]
        struct Stub;
        #[async_trait]
        impl CaptionProvider for Stub {
            async fn caption(&self, _p: &str, _i: &str) -> Result<String, CaptionError> {
                Ok("stub".into())
            }
        }

        let config = BundleConfig::builder()
            .captioner(Arc::new(Stub))
            .build()
            .unwrap();
        assert!(resolve_captioner(&config, None).is_ok());
    }

    #[test]
    fn captioner_resolution_uses_api_key() {
        let config = BundleConfig::builder().api_key("sk-test").build().unwrap();
        assert!(resolve_captioner(&config, None).is_ok());
    }

    #[test]
    fn captioner_resolution_falls_back_to_environment_key() {
        let config = BundleConfig::builder().build().unwrap();
        assert!(resolve_captioner(&config, Some("sk-env".into())).is_ok());
    }

    #[test]
    fn captioner_resolution_fails_without_any_source() {
        let config = BundleConfig::builder().build().unwrap();
        let err = resolve_captioner(&config, None).unwrap_err();
        assert!(matches!(err, Md2RagError::CaptionerNotConfigured { .. }));

        // An empty environment value is no key at all.
        let err = resolve_captioner(&config, Some(String::new())).unwrap_err();
        assert!(matches!(err, Md2RagError::CaptionerNotConfigured { .. }));
    }
}

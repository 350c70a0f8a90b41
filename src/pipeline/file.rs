//! The per-document pipeline: read, split frontmatter, rewrite images,
//! merge metadata, serialize.
//!
//! Always returns a [`FileResult`] — never propagates an error upward, so a
//! single bad document doesn't abort the batch. The orchestrator checks
//! `result.error` to decide whether the document enters the bundle.

use crate::output::FileResult;
use crate::pipeline::{frontmatter, images::ImageRewriter};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error};

/// Run one document through the pipeline.
pub async fn process_file(path: &Path, rewriter: &ImageRewriter) -> FileResult {
    let start = Instant::now();

    let content = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) => {
            error!("Error reading {}: {e}", path.display());
            return FileResult {
                path: path.to_path_buf(),
                text: String::new(),
                images_found: 0,
                images_processed: 0,
                duration_ms: start.elapsed().as_millis() as u64,
                error: Some(crate::error::FileError::ReadFailed {
                    path: path.to_path_buf(),
                    detail: e.to_string(),
                }),
            };
        }
    };

    let (parsed, body) = frontmatter::split(&content, path);
    let outcome = rewriter.rewrite(body, path).await;
    // word_count / has_images reflect the source body, pre-rewrite.
    let metadata = frontmatter::merge_metadata(path, parsed, body);
    let text = frontmatter::render(&metadata, &outcome.body);

    debug!(
        "Processed {} ({} images, {}ms)",
        path.display(),
        outcome.images_processed,
        start.elapsed().as_millis()
    );

    FileResult {
        path: path.to_path_buf(),
        text,
        images_found: outcome.images_found,
        images_processed: outcome.images_processed,
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    }
}

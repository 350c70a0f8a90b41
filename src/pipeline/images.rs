//! Image rewriting: scan a document body and replace local image references.
//!
//! Each `![alt](path)` tag pointing at a local file is resolved, optimized,
//! stored under a hash name, captioned, and rewritten as
//! `[Image: <description>](media://<storedFilename>)`. Remote URLs and data
//! URIs pass through untouched — only images we can read from disk enter the
//! media store.
//!
//! Every per-image failure is local: an unresolvable reference becomes
//! `[Missing Image: <alt>]`, a failed optimization or store becomes
//! `[Failed to process image: <alt>]`, and the scan moves on. One broken
//! image never costs the containing document.

use crate::caption::CaptionGenerator;
use crate::pipeline::{optimize, resolve, store::MediaStore};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The Markdown/MDX image tag: `![alt](path)`.
static RE_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"!\[(.*?)\]\((.*?)\)").unwrap());

/// Everything the per-image pipeline needs, shared across all file workers.
pub struct ImageRewriter {
    store: MediaStore,
    captions: CaptionGenerator,
    docs_root: Option<PathBuf>,
    size_limit: u64,
}

/// The rewritten body plus this document's image counters, merged into the
/// run stats by the orchestrator.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub body: String,
    pub images_found: usize,
    pub images_processed: usize,
}

impl ImageRewriter {
    pub fn new(
        store: MediaStore,
        captions: CaptionGenerator,
        docs_root: Option<PathBuf>,
        size_limit: u64,
    ) -> Self {
        Self {
            store,
            captions,
            docs_root,
            size_limit,
        }
    }

    /// Rewrite every local image reference in `body`.
    ///
    /// Matches are processed in document order. The replacement involves an
    /// await (captioning), so this walks the matches manually instead of
    /// using `Regex::replace_all`.
    pub async fn rewrite(&self, body: &str, doc_path: &Path) -> RewriteOutcome {
        let mut out = String::with_capacity(body.len());
        let mut last_end = 0;
        let mut images_found = 0;
        let mut images_processed = 0;

        for caps in RE_IMAGE.captures_iter(body) {
            let whole = caps.get(0).expect("group 0 always present");
            let alt = caps.get(1).map_or("", |m| m.as_str());
            let reference = caps.get(2).map_or("", |m| m.as_str());

            out.push_str(&body[last_end..whole.start()]);
            last_end = whole.end();

            if is_remote(reference) {
                // Remote images stay as written.
                out.push_str(whole.as_str());
                continue;
            }

            let replacement = self
                .process_reference(alt, reference, doc_path, &mut images_found, &mut images_processed)
                .await;
            out.push_str(&replacement);
        }
        out.push_str(&body[last_end..]);

        RewriteOutcome {
            body: out,
            images_found,
            images_processed,
        }
    }

    /// Resolve, optimize, store, and caption a single local reference,
    /// returning the replacement text. Never fails — failures degrade to
    /// placeholder text.
    async fn process_reference(
        &self,
        alt: &str,
        reference: &str,
        doc_path: &Path,
        images_found: &mut usize,
        images_processed: &mut usize,
    ) -> String {
        let Some(resolved) = resolve::resolve_image(reference, doc_path, self.docs_root.as_deref())
        else {
            warn!("Image not found in any location: {reference}");
            return format!("[Missing Image: {alt}]");
        };
        *images_found += 1;

        // Re-encoding is CPU-bound; keep it off the async hot path.
        let limit = self.size_limit;
        let optimize_path = resolved.clone();
        let optimized =
            match tokio::task::spawn_blocking(move || optimize::optimize(&optimize_path, limit))
                .await
            {
                Ok(Ok(img)) => img,
                Ok(Err(e)) => {
                    warn!("{e}");
                    return format!("[Failed to process image: {alt}]");
                }
                Err(e) => {
                    warn!("Optimization task panicked for {}: {e}", resolved.display());
                    return format!("[Failed to process image: {alt}]");
                }
            };

        let filename = match self.store.store(&resolved, &optimized).await {
            Ok(name) => name,
            Err(e) => {
                warn!("{e}");
                return format!("[Failed to process image: {alt}]");
            }
        };

        let description = self.captions.describe(alt, &optimized.bytes).await;
        *images_processed += 1;
        debug!("Processed image: {reference} -> {filename}");

        format!("[Image: {description}](media://{filename})")
    }
}

/// Remote URLs and data URIs are left untouched.
fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://")
        || reference.starts_with("https://")
        || reference.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::CaptionProvider;
    use crate::error::CaptionError;
    use crate::limiter::RateLimiter;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[derive(Debug)]
    struct FixedCaptioner;

    #[async_trait]
    impl CaptionProvider for FixedCaptioner {
        async fn caption(&self, _prompt: &str, _image: &str) -> Result<String, CaptionError> {
            Ok("a small test image".to_string())
        }
    }

    fn rewriter(dir: &TempDir) -> ImageRewriter {
        let store = MediaStore::create(dir.path().join("media")).unwrap();
        let limiter = Arc::new(RateLimiter::new(1000.0, 1000.0).unwrap());
        let captions = CaptionGenerator::new(Arc::new(FixedCaptioner), limiter);
        ImageRewriter::new(store, captions, None, 20 * 1024 * 1024)
    }

    fn write_doc_with_image(dir: &TempDir) -> (PathBuf, PathBuf) {
        let doc = dir.path().join("page.md");
        std::fs::write(&doc, "irrelevant").unwrap();
        let img_path = dir.path().join("logo.png");
        let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 10, 10]));
        img.save(&img_path).unwrap();
        (doc, img_path)
    }

    #[test]
    fn remote_detection() {
        assert!(is_remote("https://example.com/a.png"));
        assert!(is_remote("http://example.com/a.png"));
        assert!(is_remote("data:image/png;base64,AAAA"));
        assert!(!is_remote("images/a.png"));
        assert!(!is_remote("/images/a.png"));
    }

    #[tokio::test]
    async fn local_image_is_rewritten_to_media_reference() {
        let dir = TempDir::new().unwrap();
        let rw = rewriter(&dir);
        let (doc, img_path) = write_doc_with_image(&dir);

        let outcome = rw.rewrite("before ![logo](logo.png) after", &doc).await;
        let expected_name = MediaStore::stored_name(&img_path, "png");
        assert_eq!(
            outcome.body,
            format!("before [Image: a small test image](media://{expected_name}) after")
        );
        assert_eq!(outcome.images_found, 1);
        assert_eq!(outcome.images_processed, 1);
    }

    #[tokio::test]
    async fn remote_image_passes_through() {
        let dir = TempDir::new().unwrap();
        let rw = rewriter(&dir);
        let doc = dir.path().join("page.md");
        std::fs::write(&doc, "x").unwrap();

        let body = "![remote](https://example.com/pic.png)";
        let outcome = rw.rewrite(body, &doc).await;
        assert_eq!(outcome.body, body);
        assert_eq!(outcome.images_found, 0);
        assert_eq!(outcome.images_processed, 0);
    }

    #[tokio::test]
    async fn missing_image_becomes_placeholder_without_counting() {
        let dir = TempDir::new().unwrap();
        let rw = rewriter(&dir);
        let doc = dir.path().join("page.md");
        std::fs::write(&doc, "x").unwrap();

        let outcome = rw.rewrite("![ghost image](ghost.png)", &doc).await;
        assert_eq!(outcome.body, "[Missing Image: ghost image]");
        assert_eq!(outcome.images_found, 0);
        assert_eq!(outcome.images_processed, 0);
    }

    #[tokio::test]
    async fn mixed_body_rewrites_only_local_references() {
        let dir = TempDir::new().unwrap();
        let rw = rewriter(&dir);
        let (doc, _) = write_doc_with_image(&dir);

        let body = "![logo](logo.png)\n\n![remote](https://example.com/a.png)\n\n![gone](nope.png)";
        let outcome = rw.rewrite(body, &doc).await;
        assert!(outcome.body.contains("media://"));
        assert!(outcome.body.contains("![remote](https://example.com/a.png)"));
        assert!(outcome.body.contains("[Missing Image: gone]"));
        assert_eq!(outcome.images_found, 1);
        assert_eq!(outcome.images_processed, 1);
    }
}

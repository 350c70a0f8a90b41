//! Configuration types for documentation bundling.
//!
//! All pipeline behaviour is controlled through [`BundleConfig`], built via
//! its [`BundleConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across workers, serialise them for logging, and
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A ten-field constructor is unreadable and breaks on every new field. The
//! builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::caption::CaptionProvider;
use crate::error::Md2RagError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default byte ceiling for stored images: 20 MiB, matching typical vision
/// API upload limits.
pub const DEFAULT_IMAGE_SIZE_LIMIT: u64 = 20 * 1024 * 1024;

/// Configuration for a bundling run.
///
/// Built via [`BundleConfig::builder()`] or [`BundleConfig::default()`].
///
/// # Example
/// ```rust
/// use md2rag::BundleConfig;
///
/// let config = BundleConfig::builder()
///     .media_dir("media_storage")
///     .concurrency(8)
///     .rate_limit(10.0)
///     .burst_limit(30.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BundleConfig {
    /// Directory receiving the hash-named optimized images. Default: `media_storage`.
    ///
    /// Created if absent. The directory is a flat, append-only sink; a
    /// filename is derived from the md5 of the resolved source path, so
    /// repeated runs overwrite the same entries with identical bytes.
    pub media_dir: PathBuf,

    /// Documentation root used to resolve absolute image references
    /// (`/images/foo.png`). Default: none — absolute references then only
    /// probe relative to the referencing document.
    pub docs_root: Option<PathBuf>,

    /// Number of documents processed in parallel. Default: 4.
    ///
    /// Workers are I/O-bound (file reads, captioning calls); the captioning
    /// quota is enforced separately by the rate limiter, so raising this only
    /// increases the number of in-flight documents, not the API rate.
    pub concurrency: usize,

    /// Byte ceiling for stored images. Default: 20 MiB.
    ///
    /// Images over the ceiling are re-encoded through the quality/resize
    /// ladder until they fit (see the optimizer module).
    pub image_size_limit: u64,

    /// Captioning requests per second granted by the shared limiter. Default: 10.0.
    pub rate_limit: f64,

    /// Maximum captioning-request burst. Default: 30.0.
    ///
    /// The token bucket starts full, so up to `burst_limit` requests go out
    /// immediately at the start of a run before the sustained rate applies.
    pub burst_limit: f64,

    /// Vision model identifier. Default: `gpt-4o-mini`.
    pub model: String,

    /// API credential for the captioning service. Falls back to the
    /// `OPENAI_API_KEY` environment variable when unset.
    pub api_key: Option<String>,

    /// OpenAI-compatible completions endpoint override (Ollama, vLLM,
    /// LiteLLM, a corporate gateway, …). Default: the OpenAI endpoint.
    pub api_endpoint: Option<String>,

    /// Pre-constructed caption provider. Takes precedence over `api_key`;
    /// the way tests inject a stub and hosts inject custom middleware.
    pub captioner: Option<Arc<dyn CaptionProvider>>,

    /// Optional progress callback receiving per-file events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            media_dir: PathBuf::from("media_storage"),
            docs_root: None,
            concurrency: 4,
            image_size_limit: DEFAULT_IMAGE_SIZE_LIMIT,
            rate_limit: 10.0,
            burst_limit: 30.0,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_endpoint: None,
            captioner: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for BundleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleConfig")
            .field("media_dir", &self.media_dir)
            .field("docs_root", &self.docs_root)
            .field("concurrency", &self.concurrency)
            .field("image_size_limit", &self.image_size_limit)
            .field("rate_limit", &self.rate_limit)
            .field("burst_limit", &self.burst_limit)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_endpoint", &self.api_endpoint)
            .field("captioner", &self.captioner.as_ref().map(|_| "<dyn CaptionProvider>"))
            .finish()
    }
}

impl BundleConfig {
    /// Create a new builder for `BundleConfig`.
    pub fn builder() -> BundleConfigBuilder {
        BundleConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BundleConfig`].
pub struct BundleConfigBuilder {
    config: BundleConfig,
}

impl BundleConfigBuilder {
    pub fn media_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.media_dir = dir.into();
        self
    }

    pub fn docs_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.docs_root = Some(root.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn image_size_limit(mut self, bytes: u64) -> Self {
        self.config.image_size_limit = bytes;
        self
    }

    pub fn rate_limit(mut self, per_second: f64) -> Self {
        self.config.rate_limit = per_second;
        self
    }

    pub fn burst_limit(mut self, burst: f64) -> Self {
        self.config.burst_limit = burst;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.api_endpoint = Some(endpoint.into());
        self
    }

    pub fn captioner(mut self, provider: Arc<dyn CaptionProvider>) -> Self {
        self.config.captioner = Some(provider);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BundleConfig, Md2RagError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Md2RagError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.rate_limit <= 0.0 || !c.rate_limit.is_finite() {
            return Err(Md2RagError::InvalidConfig(format!(
                "Rate limit must be > 0 requests/second, got {}",
                c.rate_limit
            )));
        }
        if c.burst_limit <= 0.0 || !c.burst_limit.is_finite() {
            return Err(Md2RagError::InvalidConfig(format!(
                "Burst limit must be > 0, got {}",
                c.burst_limit
            )));
        }
        if c.image_size_limit == 0 {
            return Err(Md2RagError::InvalidConfig(
                "Image size limit must be > 0 bytes".into(),
            ));
        }
        Ok(self.config)
    }
}

//! # md2rag
//!
//! Bundle a tree of Markdown/MDX documentation into one retrieval-ready
//! document, with embedded images rewritten into a normalized media store and
//! captioned by a Vision Language Model (VLM).
//!
//! ## Why this crate?
//!
//! Documentation trees feed retrieval pipelines badly: content is scattered
//! across hundreds of files, image references point at paths that mean nothing
//! outside the site generator, and the images themselves carry information no
//! embedding of the surrounding text captures. This crate flattens a tree
//! into a single document with per-file metadata, moves every local image
//! into a stable hash-named media store, and replaces each reference with an
//! AI-generated description a retriever can actually match against.
//!
//! ## Pipeline Overview
//!
//! ```text
//! docs/
//!  │
//!  ├─ 1. Discover  recursive scan for .md / .mdx files
//!  ├─ 2. Process   bounded worker pool, one task per file
//!  │     ├─ split YAML frontmatter
//!  │     ├─ resolve → optimize → store each local image
//!  │     ├─ caption via VLM (shared token-bucket rate limiter)
//!  │     └─ merge metadata, re-serialize
//!  └─ 3. Assemble  sort blocks, join with separator, prepend run summary
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2rag::{bundle, BundleConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Captioner auto-configured from OPENAI_API_KEY
//!     let config = BundleConfig::default();
//!     let output = bundle("docs/", &config).await?;
//!     println!("{}", output.document);
//!     eprintln!("{}", output.stats.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2rag` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! md2rag = { version = "0.3", default-features = false }
//! ```
//!
//! ## Failure model
//!
//! Only discovery and configuration errors abort a run. A file that fails is
//! logged, counted, and dropped from the bundle; an image that fails becomes
//! placeholder text inside its document; a caption that fails degrades to the
//! original alt text. Partial output beats no output for batch ingestion.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod caption;
pub mod config;
pub mod error;
pub mod limiter;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use caption::{CaptionGenerator, CaptionProvider, OpenAiCaptioner};
pub use config::{BundleConfig, BundleConfigBuilder};
pub use error::{CaptionError, FileError, ImageError, Md2RagError};
pub use limiter::RateLimiter;
pub use output::{BundleOutput, FileResult, RunStats};
pub use process::{bundle, bundle_sync, bundle_to_file, write_document, FILE_SEPARATOR};
pub use progress::{BundleProgressCallback, NoopProgressCallback, ProgressCallback};

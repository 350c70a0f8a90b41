//! Error types for the md2rag library.
//!
//! The error taxonomy mirrors the propagation policy of the pipeline:
//!
//! * [`Md2RagError`] — **Fatal**: the run cannot proceed at all (no documents
//!   found, invalid configuration, no captioner). Returned as
//!   `Err(Md2RagError)` from the top-level `bundle*` functions.
//!
//! * [`FileError`] — **Non-fatal, per file**: one document failed (I/O error,
//!   invalid UTF-8) but every other document is fine. Stored inside
//!   [`crate::output::FileResult`]; the file is excluded from the combined
//!   document and the run continues.
//!
//! * [`ImageError`] — **Non-fatal, per image**: a single embedded image could
//!   not be resolved, optimized, or stored. Rendered as placeholder text in
//!   the containing document, never propagated past the image.
//!
//! * [`CaptionError`] — failures of the external captioning call. These are
//!   consumed inside [`crate::caption::CaptionGenerator::describe`], which
//!   degrades to the original alt text; they never escape that boundary.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the md2rag library.
///
/// File-level failures use [`FileError`] and are stored in
/// [`crate::output::FileResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Md2RagError {
    // ── Discovery errors ──────────────────────────────────────────────────
    /// The recursive scan found no `.md` or `.mdx` files.
    #[error("No Markdown (.md) or MDX (.mdx) files found in '{dir}'")]
    NoFilesFound { dir: PathBuf },

    /// The input directory does not exist or is not readable.
    #[error("Documentation directory not found: '{path}'")]
    DirectoryNotFound { path: PathBuf },

    // ── Captioner errors ──────────────────────────────────────────────────
    /// No caption provider could be constructed (missing API key etc.).
    #[error("No caption provider is configured.\n{hint}")]
    CaptionerNotConfigured { hint: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the media storage directory.
    #[error("Failed to create media directory '{path}': {source}")]
    MediaDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the combined output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored alongside [`crate::output::FileResult`] when a file fails.
/// The overall run continues with the remaining files.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// The file could not be read (I/O error, invalid UTF-8).
    #[error("Failed to read '{path}': {detail}")]
    ReadFailed { path: PathBuf, detail: String },

    /// Any other unhandled failure within the per-file pipeline.
    #[error("Failed to process '{path}': {detail}")]
    Processing { path: PathBuf, detail: String },
}

/// A non-fatal error for a single embedded image.
///
/// Converted to placeholder text by the image rewriter; never aborts the
/// containing file.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// The referenced image exists at none of the candidate locations.
    #[error("Image not found in any candidate location: '{reference}'")]
    Missing { reference: String },

    /// The optimizer could not bring the image under the size ceiling.
    #[error("Failed to optimize image '{path}': {detail}")]
    OptimizationFailed { path: PathBuf, detail: String },

    /// The optimized bytes could not be written to the media store.
    #[error("Failed to store image '{path}': {detail}")]
    StoreFailed { path: PathBuf, detail: String },
}

/// A failure of the external captioning call.
///
/// Consumed by the caption generator's fallback logic; callers of
/// [`crate::caption::CaptionGenerator::describe`] never see these.
#[derive(Debug, Error)]
pub enum CaptionError {
    /// The HTTP request could not be sent or the response not read.
    #[error("Caption request failed: {0}")]
    Request(String),

    /// The API answered with a non-success status.
    #[error("Caption API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered but the response carried no usable text.
    #[error("Caption API returned an empty response")]
    EmptyResponse,
}

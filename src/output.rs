//! Output types: per-file results, run statistics, and the combined bundle.
//!
//! Workers share no mutable counters. Each file worker returns a complete
//! [`FileResult`] record; the orchestrator merges them into [`RunStats`]
//! after the pool drains. Merging post-hoc instead of locking a shared
//! aggregator keeps the worker code free of synchronisation entirely.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The outcome of processing one discovered document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Path of the source document.
    pub path: PathBuf,

    /// Rendered output: frontmatter block plus rewritten body.
    /// Empty when `error` is set.
    pub text: String,

    /// Local images that resolved to a file on disk.
    pub images_found: usize,

    /// Images successfully optimized, stored, and captioned.
    pub images_processed: usize,

    /// Wall-clock time spent on this file.
    pub duration_ms: u64,

    /// Set when the file failed; the file is then excluded from the bundle.
    pub error: Option<FileError>,
}

/// Process-wide counters, merged from per-worker [`FileResult`] records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Documents discovered by the recursive scan.
    pub total_files: usize,
    /// Documents that produced output.
    pub processed_files: usize,
    /// Local images that resolved on disk across all documents.
    pub total_images: usize,
    /// Images optimized, stored, and captioned.
    pub processed_images: usize,
    /// Human-readable descriptions of every per-file failure.
    pub errors: Vec<String>,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
}

impl RunStats {
    /// Render the human-readable run summary that heads the combined
    /// document and is printed at process exit.
    pub fn summary(&self) -> String {
        format!(
            "\nProcessing Summary:\n\
             -----------------\n\
             Files Processed: {}/{}\n\
             Images Processed: {}/{}\n\
             Duration: {:.2}s\n\
             Errors: {}\n",
            self.processed_files,
            self.total_files,
            self.processed_images,
            self.total_images,
            self.total_duration_ms as f64 / 1000.0,
            self.errors.len(),
        )
    }
}

/// Result of a complete bundling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleOutput {
    /// The combined retrieval-ready document: summary comment block, then
    /// per-file blocks joined by the fixed separator.
    pub document: String,

    /// Per-file records, including failed files (with their errors).
    pub files: Vec<FileResult>,

    /// Merged run statistics.
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_contains_counters() {
        let stats = RunStats {
            total_files: 4,
            processed_files: 3,
            total_images: 2,
            processed_images: 2,
            errors: vec!["boom".into()],
            total_duration_ms: 1500,
        };
        let s = stats.summary();
        assert!(s.contains("Files Processed: 3/4"));
        assert!(s.contains("Images Processed: 2/2"));
        assert!(s.contains("Errors: 1"));
        assert!(s.contains("1.50s"));
    }

    #[test]
    fn file_result_serialises() {
        let r = FileResult {
            path: PathBuf::from("docs/a.md"),
            text: "---\n---\n\nbody".into(),
            images_found: 1,
            images_processed: 1,
            duration_ms: 12,
            error: None,
        };
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("docs/a.md"));
    }
}

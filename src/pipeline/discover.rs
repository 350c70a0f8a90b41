//! Document discovery: recursive scan for Markdown/MDX files.
//!
//! Discovery is the only fatal stage of the pipeline: an empty result aborts
//! the run before any work starts, because a bundle of zero documents is a
//! caller mistake (wrong directory) rather than a degradable condition.

use crate::error::Md2RagError;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;

/// File extensions recognised as documentation sources.
const DOC_EXTENSIONS: [&str; 2] = ["md", "mdx"];

/// Recursively collect every `.md` and `.mdx` file under `root`.
///
/// The returned list is sorted by path so discovery order (and therefore log
/// and stats order) is deterministic across runs; final document order is
/// decided later, at assembly.
///
/// # Errors
/// [`Md2RagError::DirectoryNotFound`] when `root` does not exist, and
/// [`Md2RagError::NoFilesFound`] when the tree contains no matching files.
pub fn find_documents(root: &Path) -> Result<Vec<PathBuf>, Md2RagError> {
    if !root.is_dir() {
        return Err(Md2RagError::DirectoryNotFound {
            path: root.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| DOC_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    if files.is_empty() {
        return Err(Md2RagError::NoFilesFound {
            dir: root.to_path_buf(),
        });
    }

    files.sort();
    info!("Found {} documentation files under {}", files.len(), root.display());
    Ok(files)
}

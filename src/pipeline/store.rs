//! Media store: a flat directory of hash-named optimized images.
//!
//! Filenames are derived from the md5 of the *resolved source path string*,
//! not the image bytes. The scheme is deliberately path-addressed: the same
//! reference always lands on the same filename, so repeated runs (and
//! concurrent workers hitting the same image) overwrite identically instead
//! of accumulating copies. Identical bytes at two different paths produce two
//! stored assets — the store does not deduplicate content.
//!
//! No lock guards the directory. Racing writers target the same derived
//! filename only when they resolved the same path, in which case they write
//! the same bytes and the race is benign.

use crate::error::{ImageError, Md2RagError};
use crate::pipeline::optimize::OptimizedImage;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writer for the flat, append-only media directory.
#[derive(Debug, Clone)]
pub struct MediaStore {
    dir: PathBuf,
}

impl MediaStore {
    /// Create the store, making the directory if absent.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, Md2RagError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| Md2RagError::MediaDirFailed {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The directory backing this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Derive the stored filename for an image resolved at `source`:
    /// `<md5-of-path-string>.<ext>`.
    pub fn stored_name(source: &Path, ext: &str) -> String {
        let digest = md5::compute(source.to_string_lossy().as_bytes());
        format!("{digest:x}.{ext}")
    }

    /// Write the optimized bytes under the path-derived name and return the
    /// stored filename. Idempotent: the same source path always produces the
    /// same name and an identical overwrite.
    pub async fn store(
        &self,
        source: &Path,
        image: &OptimizedImage,
    ) -> Result<String, ImageError> {
        let name = Self::stored_name(source, &image.ext);
        let target = self.dir.join(&name);

        tokio::fs::write(&target, &image.bytes)
            .await
            .map_err(|e| ImageError::StoreFailed {
                path: source.to_path_buf(),
                detail: e.to_string(),
            })?;

        debug!("Stored {} -> {}", source.display(), name);
        Ok(name)
    }
}

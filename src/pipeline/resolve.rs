//! Image resolution: map a Markdown reference to a file on disk.
//!
//! Documentation trees are messy: image paths are written relative to the
//! site root, relative to the document, or as bare filenames, and the same
//! reference style means different things in different generators. Rather
//! than guessing one convention, resolution probes an ordered candidate list
//! and takes the first hit.

use std::path::{Path, PathBuf};

/// Build the ordered list of filesystem locations to probe for `reference`,
/// as written in the document at `doc_path`.
///
/// Precedence:
/// 1. the document's own directory + the bare filename of the reference
/// 2. the document's own directory + the reference with any leading `/`
///    stripped (coincides with 1 for bare filenames)
/// 3. only when the reference is absolute and a documentation root is
///    configured: the root + the reference with the leading `/` stripped
pub fn candidate_paths(
    reference: &str,
    doc_path: &Path,
    docs_root: Option<&Path>,
) -> Vec<PathBuf> {
    let doc_dir = doc_path.parent().unwrap_or_else(|| Path::new(""));
    let mut candidates = Vec::with_capacity(3);

    if let Some(name) = Path::new(reference).file_name() {
        candidates.push(doc_dir.join(name));
    }
    candidates.push(doc_dir.join(reference.trim_start_matches('/')));

    if reference.starts_with('/') {
        if let Some(root) = docs_root {
            candidates.push(root.join(reference.trim_start_matches('/')));
        }
    }

    candidates
}

/// Resolve a reference to the first candidate that exists on disk.
pub fn resolve_image(
    reference: &str,
    doc_path: &Path,
    docs_root: Option<&Path>,
) -> Option<PathBuf> {
    candidate_paths(reference, doc_path, docs_root)
        .into_iter()
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn bare_filename_candidate_order() {
        let doc = Path::new("/docs/a/b.md");
        let candidates = candidate_paths("img.png", doc, None);
        assert_eq!(candidates[0], Path::new("/docs/a/img.png"));
        assert_eq!(candidates[1], Path::new("/docs/a/img.png"));
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn relative_path_keeps_subdirectory_in_second_candidate() {
        let doc = Path::new("/docs/a/b.md");
        let candidates = candidate_paths("images/img.png", doc, None);
        assert_eq!(candidates[0], Path::new("/docs/a/img.png"));
        assert_eq!(candidates[1], Path::new("/docs/a/images/img.png"));
    }

    #[test]
    fn absolute_reference_adds_docs_root_candidate() {
        let doc = Path::new("/docs/a/b.md");
        let root = Path::new("/site");
        let candidates = candidate_paths("/images/img.png", doc, Some(root));
        assert_eq!(candidates[0], Path::new("/docs/a/img.png"));
        assert_eq!(candidates[1], Path::new("/docs/a/images/img.png"));
        assert_eq!(candidates[2], Path::new("/site/images/img.png"));
    }

    #[test]
    fn absolute_reference_without_root_has_no_third_candidate() {
        let doc = Path::new("/docs/a/b.md");
        let candidates = candidate_paths("/images/img.png", doc, None);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn resolve_takes_first_existing_candidate() {
        let dir = TempDir::new().unwrap();
        let doc_dir = dir.path().join("docs");
        std::fs::create_dir_all(doc_dir.join("images")).unwrap();
        let doc = doc_dir.join("page.md");
        std::fs::write(&doc, "# page").unwrap();

        // Only the subdirectory copy exists: second candidate wins.
        std::fs::write(doc_dir.join("images/logo.png"), b"png").unwrap();
        let hit = resolve_image("images/logo.png", &doc, None).unwrap();
        assert_eq!(hit, doc_dir.join("images/logo.png"));

        // Sibling copy appears: first candidate now shadows it.
        std::fs::write(doc_dir.join("logo.png"), b"png").unwrap();
        let hit = resolve_image("images/logo.png", &doc, None).unwrap();
        assert_eq!(hit, doc_dir.join("logo.png"));
    }

    #[test]
    fn resolve_missing_returns_none() {
        let dir = TempDir::new().unwrap();
        let doc = dir.path().join("page.md");
        std::fs::write(&doc, "# page").unwrap();
        assert!(resolve_image("ghost.png", &doc, None).is_none());
    }
}

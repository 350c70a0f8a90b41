//! Progress-callback trait for per-file bundling events.
//!
//! Inject an [`Arc<dyn BundleProgressCallback>`] via
//! [`crate::config::BundleConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline processes each document.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database record,
//! or a terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` so it works
//! correctly when files are processed concurrently.

use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it processes each document.
///
/// Implementations must be `Send + Sync` (files are processed concurrently).
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_file_start`, `on_file_complete`, and `on_file_error` may be called
/// concurrently from different tasks. Implementations must protect shared
/// mutable state with appropriate synchronisation primitives (e.g. `Mutex`,
/// `AtomicUsize`).
pub trait BundleProgressCallback: Send + Sync {
    /// Called once after discovery, before any file is processed.
    fn on_run_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called when a worker picks up a document.
    fn on_file_start(&self, path: &Path, total_files: usize) {
        let _ = (path, total_files);
    }

    /// Called when a document is successfully rendered.
    ///
    /// `output_len` is the byte length of the rendered block (useful for
    /// progress bars that track output size).
    fn on_file_complete(&self, path: &Path, total_files: usize, output_len: usize) {
        let _ = (path, total_files, output_len);
    }

    /// Called when a document fails and is dropped from the bundle.
    fn on_file_error(&self, path: &Path, total_files: usize, error: &str) {
        let _ = (path, total_files, error);
    }

    /// Called once after every file has been attempted.
    fn on_run_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BundleProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BundleConfig`].
pub type ProgressCallback = Arc<dyn BundleProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        final_success: AtomicUsize,
    }

    impl BundleProgressCallback for TrackingCallback {
        fn on_file_start(&self, _path: &Path, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _path: &Path, _total: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_error(&self, _path: &Path, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total: usize, success_count: usize) {
            self.final_success.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(2);
        cb.on_file_start(Path::new("a.md"), 2);
        cb.on_file_complete(Path::new("a.md"), 2, 42);
        cb.on_file_error(Path::new("b.md"), 2, "boom");
        cb.on_run_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            final_success: AtomicUsize::new(0),
        };

        let a = PathBuf::from("a.md");
        let b = PathBuf::from("b.md");
        tracker.on_run_start(2);
        tracker.on_file_start(&a, 2);
        tracker.on_file_complete(&a, 2, 100);
        tracker.on_file_start(&b, 2);
        tracker.on_file_error(&b, 2, "read failed");
        tracker.on_run_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.final_success.load(Ordering::SeqCst), 1);
    }
}

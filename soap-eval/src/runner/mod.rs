//! Batch evaluation pipeline

pub mod batch;

pub use batch::{BatchRunner, RunError, RunOutcome, SkippedFile};

/// Progress callback for tracking a batch run
pub trait ProgressCallback {
    fn on_file_start(&self, path: &std::path::Path);
    fn on_file_complete(&self, path: &std::path::Path, has_error: bool);
    fn on_file_skipped(&self, path: &std::path::Path, reason: &str);
    fn on_progress(&self, completed: usize, total: usize);
}

/// Default no-op progress callback
pub struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_file_start(&self, _path: &std::path::Path) {}
    fn on_file_complete(&self, _path: &std::path::Path, _has_error: bool) {}
    fn on_file_skipped(&self, _path: &std::path::Path, _reason: &str) {}
    fn on_progress(&self, _completed: usize, _total: usize) {}
}

/// Progress reported through `tracing` at debug level
pub struct LogProgress;

impl ProgressCallback for LogProgress {
    fn on_file_start(&self, path: &std::path::Path) {
        tracing::debug!("Evaluating {}", path.display());
    }

    fn on_file_complete(&self, path: &std::path::Path, has_error: bool) {
        let status = if has_error { "ERROR RECORD" } else { "OK" };
        tracing::debug!("{} {}", status, path.display());
    }

    fn on_file_skipped(&self, path: &std::path::Path, reason: &str) {
        tracing::warn!("Skipping {}: {}", path.display(), reason);
    }

    fn on_progress(&self, completed: usize, total: usize) {
        if completed == total || completed % 50 == 0 {
            tracing::info!("Progress: {}/{} files evaluated", completed, total);
        }
    }
}

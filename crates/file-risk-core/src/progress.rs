/// Trait for reporting collection and scoring progress.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_collect_start(&self) {}
    fn on_collect_progress(&self, _files_found: usize, _current_path: &str) {}
    fn on_collect_complete(&self, _total_files: usize, _duration_secs: f64) {}
    fn on_detect_complete(&self, _embedded_files: usize, _duplicate_pairs: usize, _duration_secs: f64) {}
    fn on_score_start(&self, _total_files: usize) {}
    fn on_score_progress(&self, _files_done: usize, _total_files: usize) {}
    fn on_score_complete(&self, _written: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

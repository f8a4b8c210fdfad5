/// Trait for reporting discovery progress.
///
/// CLI implements with indicatif; tests and unattended runs use [`SilentReporter`].
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _directory: &str) {}
    fn on_scan_complete(&self, _candidates: usize, _duration_secs: f64) {}
    fn on_check_start(&self, _total_files: usize) {}
    fn on_check_file(&self, _index: usize, _total_files: usize, _file_name: &str) {}
    fn on_check_result(&self, _file_name: &str, _accessible_urls: usize, _total_urls: usize) {}
    fn on_check_complete(&self, _retrievable: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

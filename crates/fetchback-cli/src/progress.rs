use colored::*;
use fetchback_core::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// CLI progress reporter using indicatif.
///
/// - Scan phase: spinner
/// - URL check phase: progress bar, one line per file checked
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn bar(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.bar();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.bar().take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, directory: &str) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars(TICKS),
        );
        pb.set_message(format!("Scanning {}...", directory));
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_scan_complete(&self, candidates: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Found {} files above threshold (excluding preserved files) in {:.2}s",
            "✓".green(),
            candidates,
            duration_secs
        );
    }

    fn on_check_start(&self, total_files: usize) {
        let pb = ProgressBar::new(total_files as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Checking URLs [{bar:30.cyan/dim}] {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICKS),
        );
        pb.enable_steady_tick(Duration::from_millis(80));
        self.set_bar(pb);
    }

    fn on_check_file(&self, index: usize, _total_files: usize, file_name: &str) {
        if let Some(pb) = self.bar().as_ref() {
            pb.set_position(index.saturating_sub(1) as u64);
            pb.set_message(file_name.to_string());
        }
    }

    fn on_check_result(&self, file_name: &str, accessible_urls: usize, total_urls: usize) {
        let line = if accessible_urls > 0 {
            format!(
                "  {} {}: retrievable ({} URLs found)",
                "✓".green(),
                file_name,
                total_urls
            )
        } else if total_urls == 0 {
            format!("  {} {}: no source URL", "·".dimmed(), file_name)
        } else {
            format!("  {} {}: no accessible URL", "✗".red(), file_name)
        };
        match self.bar().as_ref() {
            Some(pb) => {
                pb.inc(1);
                pb.println(line);
            }
            None => eprintln!("{}", line),
        }
    }

    fn on_check_complete(&self, retrievable: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} URL check complete: {} retrievable in {:.2}s",
            "✓".green(),
            retrievable,
            duration_secs
        );
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::output;

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"];

/// Spinner style shared by standalone spinners and per-model progress lines.
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_strings(TICKS)
        .template("{spinner} {prefix:.bold} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// A terminal spinner on stderr. Hidden in quiet mode.
///
/// Clears itself when dropped unless it was finished with a message.
pub struct Spinner {
    progress_bar: ProgressBar,
}

impl Spinner {
    pub fn new(message: &str) -> Self {
        let progress_bar = if output::is_quiet() {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        Self::start(progress_bar, "", message)
    }

    /// Creates a spinner line inside `multi`, labelled with `prefix`.
    pub fn attached(multi: &MultiProgress, prefix: &str, message: &str) -> Self {
        Self::start(multi.add(ProgressBar::new_spinner()), prefix, message)
    }

    fn start(progress_bar: ProgressBar, prefix: &str, message: &str) -> Self {
        progress_bar.set_style(spinner_style());
        progress_bar.set_prefix(prefix.to_string());
        progress_bar.set_message(message.to_string());
        progress_bar.enable_steady_tick(Duration::from_millis(80));
        Self { progress_bar }
    }

    pub fn set_message(&self, message: String) {
        self.progress_bar.set_message(message);
    }

    /// Stops ticking and leaves `message` on the line.
    pub fn finish_with_message(&self, message: String) {
        self.progress_bar.finish_with_message(message);
    }

    /// Stops the spinner and clears it from the terminal.
    pub fn stop(&self) {
        self.progress_bar.finish_and_clear();
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.progress_bar.is_finished() {
            self.progress_bar.finish_and_clear();
        }
    }
}

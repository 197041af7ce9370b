//! Terminal progress for generation runs

use indicatif::{ProgressBar, ProgressStyle};
use limner_core::{ProgressEvent, ProgressReporter};
use std::time::Duration;

/// Shows pipeline events on an indicatif bar
pub struct BarReporter {
    bar: ProgressBar,
}

impl BarReporter {
    /// Bar drawn to stderr
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {bar:30.cyan/blue} {pos}/{len} {msg}")
                .expect("progress template is valid")
                .progress_chars("##-"),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Clear the bar if nothing finished it
    pub fn finish(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl Default for BarReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for BarReporter {
    fn report(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::Generating { index, total, .. } => {
                self.bar.set_length(*total as u64);
                self.bar.set_position(index.saturating_sub(1) as u64);
            }
            ProgressEvent::Saving { index, .. } => self.bar.set_position(*index as u64),
            ProgressEvent::Done { .. } => {
                self.bar.finish_with_message(event.to_string());
                return;
            }
            ProgressEvent::Failed { .. } => {
                self.bar.abandon_with_message(event.to_string());
                return;
            }
            _ => {}
        }
        self.bar.set_message(event.to_string());
    }
}

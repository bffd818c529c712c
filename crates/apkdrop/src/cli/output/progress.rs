//! Live pipeline progress on the terminal

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use apkdrop_pipeline::{PipelineReporter, PipelineStage, ReportEvent};

/// Spinner for the active stage with the transcript printed above it
pub struct ConsoleReporter {
    spinner: ProgressBar,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { spinner }
    }

    /// Remove the spinner once the run has ended
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

fn stage_message(stage: PipelineStage) -> &'static str {
    match stage {
        PipelineStage::Building => "Building APK...",
        PipelineStage::Zipping => "Compressing APKs...",
        PipelineStage::Uploading => "Uploading...",
        PipelineStage::Idle | PipelineStage::Done | PipelineStage::Failed => "",
    }
}

impl PipelineReporter for ConsoleReporter {
    fn report(&self, event: &ReportEvent) {
        match event {
            ReportEvent::StageChanged { to, .. } => {
                if to.is_active() {
                    self.spinner.reset_elapsed();
                    self.spinner.set_message(stage_message(*to));
                    self.spinner.enable_steady_tick(Duration::from_millis(100));
                } else {
                    self.spinner.finish_and_clear();
                }
            }
            ReportEvent::Line(line) => {
                self.spinner.println(format!("  {}", style(line).dim()));
            }
            // shown in the run summary
            ReportEvent::Status(_) => {}
        }
    }
}

//! Pipeline stages and their timings

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Lifecycle state of one pipeline run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    /// Nothing started yet
    #[default]
    Idle,
    /// Build tool is running
    Building,
    /// Release artifacts are being compressed
    Zipping,
    /// Archive or debug artifact is being uploaded
    Uploading,
    /// Every stage succeeded
    Done,
    /// A stage failed, nothing further runs
    Failed,
}

impl PipelineStage {
    /// Lowercase name used in logs and summaries
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Zipping => "zipping",
            Self::Uploading => "uploading",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Whether the run has finished, successfully or not
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Whether a stage worker runs while in this state
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Building | Self::Zipping | Self::Uploading)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start and stop instants recorded for a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    pub stage: PipelineStage,
    pub started: Instant,
    pub finished: Instant,
}

impl StageTiming {
    pub fn elapsed(&self) -> Duration {
        self.finished.saturating_duration_since(self.started)
    }
}

/// Render a duration the way the final output lines show it: `850ms`,
/// `12.4s`, `3m05s`, `1h02m09s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    if total_secs == 0 {
        return format!("{}ms", elapsed.as_millis());
    }
    if total_secs < 60 {
        return format!("{:.1}s", elapsed.as_secs_f64());
    }

    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, seconds)
    } else {
        format!("{}m{:02}s", minutes, seconds)
    }
}

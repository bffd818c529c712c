//! Pipeline progress reporting

use std::sync::Mutex;

use crate::stage::PipelineStage;

/// Events emitted while a pipeline runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// The controller moved to a new stage
    StageChanged {
        from: PipelineStage,
        to: PipelineStage,
    },
    /// A line was appended to the live transcript
    Line(String),
    /// A line was appended to the final outputs
    Status(String),
}

/// Receives pipeline progress
pub trait PipelineReporter: Send + Sync {
    /// Handle a pipeline event
    fn report(&self, event: &ReportEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl PipelineReporter for TracingReporter {
    fn report(&self, event: &ReportEvent) {
        match event {
            ReportEvent::StageChanged { from, to } => {
                tracing::info!("Stage {} -> {}", from, to);
            }
            ReportEvent::Line(line) => {
                tracing::debug!("{}", line);
            }
            ReportEvent::Status(line) => {
                tracing::info!("{}", line);
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Stages entered, in order
    pub fn stages(&self) -> Vec<PipelineStage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReportEvent::StageChanged { to, .. } => Some(to),
                _ => None,
            })
            .collect()
    }
}

impl PipelineReporter for CollectingReporter {
    fn report(&self, event: &ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collecting_reporter_records_stages() {
        let reporter = CollectingReporter::default();
        reporter.report(&ReportEvent::StageChanged {
            from: PipelineStage::Idle,
            to: PipelineStage::Building,
        });
        reporter.report(&ReportEvent::Line("Resolving dependencies...".to_string()));
        reporter.report(&ReportEvent::StageChanged {
            from: PipelineStage::Building,
            to: PipelineStage::Failed,
        });

        assert_eq!(reporter.events().len(), 3);
        assert_eq!(
            reporter.stages(),
            vec![PipelineStage::Building, PipelineStage::Failed]
        );
    }
}

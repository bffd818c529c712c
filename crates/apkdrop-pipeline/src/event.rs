//! Stage events and the per-stage mailbox
//!
//! Every stage worker gets a fresh bounded channel. Workers send any number
//! of [`PipelineEvent::Line`] events followed by exactly one terminal event
//! ([`PipelineEvent::StageDone`] or [`PipelineEvent::StageError`]). The
//! driver reads one event at a time and feeds it to the controller.

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::StageError;

/// Message sent from a stage worker to the controller
#[derive(Debug)]
pub enum PipelineEvent {
    /// One line of human-readable progress output
    Line(String),
    /// Stage finished successfully
    StageDone,
    /// Stage failed
    StageError(StageError),
}

/// Sending half of a stage mailbox, held by the worker
#[derive(Debug, Clone)]
pub struct StageSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl StageSink {
    /// Forward a progress line. Returns `false` once the controller stopped
    /// listening; the worker may keep going and drop further lines.
    pub async fn line(&self, line: impl Into<String>) -> bool {
        self.tx.send(PipelineEvent::Line(line.into())).await.is_ok()
    }

    /// Send the single terminal event for this stage
    pub(crate) async fn finish(self, result: Result<(), StageError>) {
        let event = match result {
            Ok(()) => PipelineEvent::StageDone,
            Err(err) => PipelineEvent::StageError(err),
        };
        if self.tx.send(event).await.is_err() {
            trace!("mailbox closed before stage result was delivered");
        }
    }
}

/// Receiving half of a stage mailbox, held by the driver
#[derive(Debug)]
pub struct Mailbox {
    rx: mpsc::Receiver<PipelineEvent>,
}

impl Mailbox {
    /// Wait for the next event; `None` once every sink is gone
    pub async fn recv(&mut self) -> Option<PipelineEvent> {
        self.rx.recv().await
    }

    /// Take an already buffered event without waiting
    pub fn try_recv(&mut self) -> Option<PipelineEvent> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting events; buffered ones can still be drained
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Create a bounded mailbox for one stage
pub fn mailbox(capacity: usize) -> (StageSink, Mailbox) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (StageSink { tx }, Mailbox { rx })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lines_arrive_before_terminal_event() {
        let (sink, mut mailbox) = mailbox(8);
        assert!(sink.line("Running Gradle task 'assembleRafRelease'...").await);
        assert!(sink.line("✓ Built app-raf-release.apk").await);
        sink.finish(Ok(())).await;

        let mut events = Vec::new();
        while let Some(event) = mailbox.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], PipelineEvent::Line(_)));
        assert!(matches!(events[1], PipelineEvent::Line(_)));
        assert!(matches!(events[2], PipelineEvent::StageDone));
    }

    #[tokio::test]
    async fn test_closed_mailbox_is_reported_to_sink() {
        let (sink, mut mailbox) = mailbox(8);
        mailbox.close();
        assert!(!sink.line("dropped").await);
    }

    #[tokio::test]
    async fn test_dropped_sink_ends_mailbox() {
        let (sink, mut mailbox) = mailbox(8);
        drop(sink);
        assert!(mailbox.recv().await.is_none());
    }
}

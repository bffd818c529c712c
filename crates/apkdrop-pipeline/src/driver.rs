//! Pipeline event loop

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use apkdrop_core::{BuildSelection, Config, Flavor};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::controller::{Controller, ControllerEvent, PipelineCommand};
use crate::error::StageError;
use crate::event::{mailbox, Mailbox, PipelineEvent};
use crate::executor::{StageExecutor, ToolchainExecutor};
use crate::reporter::{PipelineReporter, ReportEvent, TracingReporter};
use crate::stage::PipelineStage;

/// Work handed to a stage worker
#[derive(Debug)]
enum StageJob {
    Build(BuildSelection),
    Zip {
        flavor: Flavor,
        archive: std::path::PathBuf,
    },
    Upload {
        path: std::path::PathBuf,
    },
}

/// Outcome of one pipeline run
#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub selection: BuildSelection,
    pub stage: PipelineStage,
    pub timings: Vec<StageSummary>,
    pub final_outputs: Vec<String>,
    pub download_link: Option<String>,
    pub error: Option<String>,
    pub interrupted: bool,
}

/// Elapsed time of one finished stage
#[derive(Debug, Clone, Serialize)]
pub struct StageSummary {
    pub stage: PipelineStage,
    pub elapsed_ms: u64,
}

impl PipelineSummary {
    pub fn succeeded(&self) -> bool {
        self.stage == PipelineStage::Done
    }
}

/// Runs the controller against real stage workers.
///
/// One worker task runs per stage. The driver owns the single active
/// mailbox, feeds every event to the controller, and performs the commands
/// it returns until the run reaches a terminal stage or quit is requested.
pub struct PipelineDriver {
    config: Config,
    executor: Arc<dyn StageExecutor>,
    reporter: Arc<dyn PipelineReporter>,
}

impl PipelineDriver {
    pub fn new(config: Config) -> Self {
        let executor = Arc::new(ToolchainExecutor::from_config(&config));
        Self::with_executor(config, executor)
    }

    pub fn with_executor(config: Config, executor: Arc<dyn StageExecutor>) -> Self {
        Self {
            config,
            executor,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Set the progress reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn PipelineReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Run the pipeline for `selection` until it finishes or `quit` resolves.
    ///
    /// On quit the loop ends immediately; a running external process is not
    /// waited for.
    #[instrument(skip_all, fields(flavor = %selection.flavor, mode = %selection.mode))]
    pub async fn run<Q>(&self, selection: BuildSelection, quit: Q) -> PipelineSummary
    where
        Q: Future<Output = ()>,
    {
        let mut controller = Controller::new(self.config.clone());
        let mut cursor = ReportCursor::default();
        let mut active: Option<Mailbox> = None;
        let mut interrupted = false;
        tokio::pin!(quit);

        let mut pending = controller.update(ControllerEvent::Selected(selection.clone()));
        cursor.publish(&controller, self.reporter.as_ref());

        loop {
            for command in pending.drain(..) {
                match command {
                    PipelineCommand::StartBuild(selection) => {
                        active = Some(
                            self.spawn_stage(PipelineStage::Building, StageJob::Build(selection)),
                        );
                    }
                    PipelineCommand::StartZip { flavor, archive } => {
                        active = Some(self.spawn_stage(
                            PipelineStage::Zipping,
                            StageJob::Zip { flavor, archive },
                        ));
                    }
                    PipelineCommand::StartUpload { path } => {
                        active = Some(self.spawn_stage(
                            PipelineStage::Uploading,
                            StageJob::Upload { path },
                        ));
                    }
                    PipelineCommand::Cleanup { path } => self.cleanup(&path).await,
                    PipelineCommand::Quit => interrupted = true,
                }
            }

            if interrupted || controller.stage().is_terminal() {
                break;
            }

            let Some(mailbox) = active.as_mut() else {
                warn!(stage = %controller.stage(), "no active stage to wait on");
                break;
            };

            let event = tokio::select! {
                biased;
                _ = &mut quit => ControllerEvent::Quit,
                event = mailbox.recv() => ControllerEvent::Stage(event.unwrap_or_else(|| {
                    PipelineEvent::StageError(StageError::Disconnected {
                        stage: controller.stage(),
                    })
                })),
            };

            pending = controller.update(event);
            cursor.publish(&controller, self.reporter.as_ref());
        }

        if let Some(mut mailbox) = active {
            mailbox.close();
        }

        let summary = PipelineSummary {
            selection,
            stage: controller.stage(),
            timings: controller
                .timings()
                .iter()
                .map(|t| StageSummary {
                    stage: t.stage,
                    elapsed_ms: u64::try_from(t.elapsed().as_millis()).unwrap_or(u64::MAX),
                })
                .collect(),
            final_outputs: controller.final_outputs().to_vec(),
            download_link: controller.download_link().map(str::to_string),
            error: controller.error().map(ToString::to_string),
            interrupted,
        };
        info!(stage = %summary.stage, interrupted, "pipeline run ended");
        summary
    }

    fn spawn_stage(&self, stage: PipelineStage, job: StageJob) -> Mailbox {
        let (sink, mailbox) = mailbox(self.config.pipeline.mailbox_capacity);
        let executor = Arc::clone(&self.executor);
        let timeout = self.config.pipeline.stage_timeout_secs;
        debug!(stage = %stage, ?timeout, "spawning stage worker");

        tokio::spawn(async move {
            let work = async {
                match &job {
                    StageJob::Build(selection) => executor.build(selection, &sink).await,
                    StageJob::Zip { flavor, archive } => {
                        executor.archive(flavor, archive, &sink).await
                    }
                    StageJob::Upload { path } => executor.upload(path, &sink).await,
                }
            };

            let result = match timeout {
                Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), work)
                    .await
                    .unwrap_or_else(|_| Err(StageError::Timeout { stage, seconds })),
                None => work.await,
            };
            sink.finish(result).await;
        });

        mailbox
    }

    async fn cleanup(&self, path: &Path) {
        match self.executor.cleanup(path).await {
            Ok(()) => debug!(path = %path.display(), "removed archive"),
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove archive"),
        }
    }
}

/// Tracks what has already been handed to the reporter
#[derive(Debug, Default)]
struct ReportCursor {
    stage_index: usize,
    transcript: usize,
    final_outputs: usize,
}

impl ReportCursor {
    fn publish(&mut self, controller: &Controller, reporter: &dyn PipelineReporter) {
        let history = controller.history();
        while self.stage_index + 1 < history.len() {
            reporter.report(&ReportEvent::StageChanged {
                from: history[self.stage_index],
                to: history[self.stage_index + 1],
            });
            self.stage_index += 1;
        }

        for line in &controller.transcript()[self.transcript..] {
            reporter.report(&ReportEvent::Line(line.clone()));
        }
        self.transcript = controller.transcript().len();

        for line in &controller.final_outputs()[self.final_outputs..] {
            reporter.report(&ReportEvent::Status(line.clone()));
        }
        self.final_outputs = controller.final_outputs().len();
    }
}

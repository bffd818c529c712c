//! Pipeline controller
//!
//! The controller is a pure reducer: [`Controller::update`] takes one
//! [`ControllerEvent`], advances the stage machine and returns the commands
//! the driver has to carry out. It never performs I/O itself, which keeps
//! every transition testable without processes or sockets.
//!
//! ```text
//! Idle -> Building -> Zipping -> Uploading -> Done
//!            \           \           \
//!             +-----------+-----------+--> Failed
//! ```

use std::path::PathBuf;
use std::time::Instant;

use apkdrop_core::{BuildSelection, Config, Flavor};
use tracing::{debug, info};

use crate::build::build_command;
use crate::error::StageError;
use crate::event::PipelineEvent;
use crate::stage::{format_elapsed, PipelineStage, StageTiming};
use crate::upload::extract_download_link;

/// Input to the controller
#[derive(Debug)]
pub enum ControllerEvent {
    /// The selection front-end confirmed both answers
    Selected(BuildSelection),
    /// The active stage worker sent an event
    Stage(PipelineEvent),
    /// The user asked to quit
    Quit,
}

/// Work the driver performs on behalf of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineCommand {
    /// Run the build tool
    StartBuild(BuildSelection),
    /// Compress the flavor's release artifacts into `archive`
    StartZip { flavor: Flavor, archive: PathBuf },
    /// Upload a file
    StartUpload { path: PathBuf },
    /// Remove a local file, failures are only logged
    Cleanup { path: PathBuf },
    /// Stop the event loop
    Quit,
}

/// Stage machine for one pipeline run
#[derive(Debug)]
pub struct Controller {
    config: Config,
    stage: PipelineStage,
    history: Vec<PipelineStage>,
    selection: Option<BuildSelection>,
    stage_started: Option<Instant>,
    timings: Vec<StageTiming>,
    transcript: Vec<String>,
    final_outputs: Vec<String>,
    error: Option<StageError>,
    download_link: Option<String>,
}

impl Controller {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stage: PipelineStage::Idle,
            history: vec![PipelineStage::Idle],
            selection: None,
            stage_started: None,
            timings: Vec::new(),
            transcript: Vec::new(),
            final_outputs: Vec::new(),
            error: None,
            download_link: None,
        }
    }

    /// Apply one event and return the commands it triggers
    pub fn update(&mut self, event: ControllerEvent) -> Vec<PipelineCommand> {
        match event {
            ControllerEvent::Selected(selection) => self.on_selected(selection),
            ControllerEvent::Stage(PipelineEvent::Line(line)) => {
                self.on_line(line);
                Vec::new()
            }
            ControllerEvent::Stage(PipelineEvent::StageDone) => self.on_stage_done(),
            ControllerEvent::Stage(PipelineEvent::StageError(err)) => self.on_stage_error(err),
            ControllerEvent::Quit => {
                info!(stage = %self.stage, "quit requested");
                vec![PipelineCommand::Quit]
            }
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Every stage entered so far, starting with `Idle`
    pub fn history(&self) -> &[PipelineStage] {
        &self.history
    }

    pub fn timings(&self) -> &[StageTiming] {
        &self.timings
    }

    /// Captured output and status lines, in arrival order
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Human-readable status lines shown once the run ends
    pub fn final_outputs(&self) -> &[String] {
        &self.final_outputs
    }

    pub fn error(&self) -> Option<&StageError> {
        self.error.as_ref()
    }

    pub fn download_link(&self) -> Option<&str> {
        self.download_link.as_deref()
    }

    fn on_selected(&mut self, selection: BuildSelection) -> Vec<PipelineCommand> {
        if self.stage != PipelineStage::Idle {
            debug!(stage = %self.stage, "ignoring selection outside idle");
            return Vec::new();
        }

        info!(selection = %selection, "pipeline started");
        self.push_status(format!("Building APK for flavor: {}", selection.flavor));
        self.push_status(format!("Building APK for build mode: {}", selection.mode));
        let command = build_command(&selection, &self.config.build);
        self.push_line(format!("$ {}", command));

        self.enter(PipelineStage::Building);
        self.selection = Some(selection.clone());
        vec![PipelineCommand::StartBuild(selection)]
    }

    fn on_line(&mut self, line: String) {
        match self.stage {
            PipelineStage::Uploading => {
                if self.download_link.is_none() {
                    if let Some(link) =
                        extract_download_link(&line, &self.config.upload.link_marker)
                    {
                        info!(link = %link, "download link received");
                        self.push_status(format!("File link: {}", link));
                        self.download_link = Some(link);
                    }
                }
                self.push_line(line);
            }
            PipelineStage::Building | PipelineStage::Zipping | PipelineStage::Failed => {
                self.push_line(line);
            }
            PipelineStage::Idle | PipelineStage::Done => {
                debug!(stage = %self.stage, "dropping line outside an active stage");
            }
        }
    }

    fn on_stage_done(&mut self) -> Vec<PipelineCommand> {
        let Some(flavor) = self.selection.as_ref().map(|s| s.flavor.clone()) else {
            debug!(stage = %self.stage, "ignoring stage result without a selection");
            return Vec::new();
        };

        match self.stage {
            PipelineStage::Building => {
                self.finish_stage("Completed command execution. ✅");
                self.enter(PipelineStage::Zipping);

                if self.config.is_fast_path(&flavor) {
                    let path = self.config.debug_artifact_path(&flavor);
                    self.push_line(format!(
                        "Skipping compression, uploading {}",
                        path.display()
                    ));
                    self.finish_stage("Compression skipped for the debug build. ✅");
                    self.enter(PipelineStage::Uploading);
                    return vec![PipelineCommand::StartUpload { path }];
                }

                self.push_line("Compressing APKs...");
                let archive = self.config.archive_path(&flavor);
                vec![PipelineCommand::StartZip { flavor, archive }]
            }
            PipelineStage::Zipping => {
                self.finish_stage("APKs compressed successfully. ✅");
                self.enter(PipelineStage::Uploading);
                vec![PipelineCommand::StartUpload {
                    path: self.config.archive_path(&flavor),
                }]
            }
            PipelineStage::Uploading => {
                self.finish_stage("File uploaded successfully. ✅");
                self.enter(PipelineStage::Done);
                info!("pipeline finished");

                if !self.config.is_fast_path(&flavor) && self.config.upload.cleanup_archive {
                    vec![PipelineCommand::Cleanup {
                        path: self.config.archive_path(&flavor),
                    }]
                } else {
                    Vec::new()
                }
            }
            PipelineStage::Idle | PipelineStage::Done | PipelineStage::Failed => {
                debug!(stage = %self.stage, "ignoring stage completion outside an active stage");
                Vec::new()
            }
        }
    }

    fn on_stage_error(&mut self, err: StageError) -> Vec<PipelineCommand> {
        if !self.stage.is_active() {
            debug!(stage = %self.stage, error = %err, "ignoring stage error outside an active stage");
            return Vec::new();
        }

        tracing::error!(stage = %self.stage, error = %err, "stage failed");
        let line = format!("Error: {}", err);
        self.push_line(line.clone());
        self.final_outputs.push(line);
        self.close_timer();
        self.enter(PipelineStage::Failed);
        self.error = Some(err);
        Vec::new()
    }

    fn enter(&mut self, stage: PipelineStage) {
        debug!(from = %self.stage, to = %stage, "stage transition");
        self.stage = stage;
        self.history.push(stage);
        self.stage_started = stage.is_active().then(Instant::now);
    }

    /// Close the active stage timer and record its elapsed time
    fn finish_stage(&mut self, message: &str) {
        self.push_status(message);
        if let Some(timing) = self.close_timer() {
            let line = format!("Elapsed time: {}", format_elapsed(timing.elapsed()));
            self.push_status(line);
        }
    }

    fn close_timer(&mut self) -> Option<StageTiming> {
        let started = self.stage_started.take()?;
        let timing = StageTiming {
            stage: self.stage,
            started,
            finished: Instant::now(),
        };
        debug!(stage = %timing.stage, elapsed_ms = timing.elapsed().as_millis() as u64, "stage timing");
        self.timings.push(timing);
        Some(timing)
    }

    fn push_line(&mut self, line: impl Into<String>) {
        self.transcript.push(line.into());
    }

    /// Status lines go to both the transcript and the final outputs
    fn push_status(&mut self, line: impl Into<String>) {
        let line = line.into();
        self.transcript.push(line.clone());
        self.final_outputs.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ArchiveError;

    fn selection(flavor: &str) -> BuildSelection {
        BuildSelection::from_answers(flavor, "release").unwrap()
    }

    fn stage_event(event: PipelineEvent) -> ControllerEvent {
        ControllerEvent::Stage(event)
    }

    fn line(text: &str) -> ControllerEvent {
        stage_event(PipelineEvent::Line(text.to_string()))
    }

    fn done() -> ControllerEvent {
        stage_event(PipelineEvent::StageDone)
    }

    fn error_lines(controller: &Controller) -> usize {
        controller
            .final_outputs()
            .iter()
            .filter(|l| l.starts_with("Error:"))
            .count()
    }

    #[test]
    fn test_happy_path_release_flavor() {
        let mut controller = Controller::new(Config::default());

        let commands = controller.update(ControllerEvent::Selected(selection("raf")));
        assert_eq!(commands, vec![PipelineCommand::StartBuild(selection("raf"))]);
        assert_eq!(controller.stage(), PipelineStage::Building);

        controller.update(line("Running Gradle task 'assembleRafRelease'..."));
        let commands = controller.update(done());
        assert_eq!(
            commands,
            vec![PipelineCommand::StartZip {
                flavor: Flavor::parse("raf").unwrap(),
                archive: PathBuf::from("raf-build-apk.zip"),
            }]
        );

        let commands = controller.update(done());
        assert_eq!(
            commands,
            vec![PipelineCommand::StartUpload {
                path: PathBuf::from("raf-build-apk.zip")
            }]
        );

        controller.update(line("MANAGE: https://oshi.at/a/TjRi"));
        controller.update(line("DL: https://oshi.at/TjRi/raf-build-apk.zip"));
        let commands = controller.update(done());
        assert_eq!(
            commands,
            vec![PipelineCommand::Cleanup {
                path: PathBuf::from("raf-build-apk.zip")
            }]
        );

        assert_eq!(
            controller.history(),
            &[
                PipelineStage::Idle,
                PipelineStage::Building,
                PipelineStage::Zipping,
                PipelineStage::Uploading,
                PipelineStage::Done,
            ]
        );
        let timed: Vec<PipelineStage> = controller.timings().iter().map(|t| t.stage).collect();
        assert_eq!(
            timed,
            vec![
                PipelineStage::Building,
                PipelineStage::Zipping,
                PipelineStage::Uploading
            ]
        );
        assert_eq!(
            controller.download_link(),
            Some("https://oshi.at/TjRi/raf-build-apk.zip")
        );
        assert!(controller
            .final_outputs()
            .contains(&"File link: https://oshi.at/TjRi/raf-build-apk.zip".to_string()));
        assert!(controller
            .final_outputs()
            .contains(&"File uploaded successfully. ✅".to_string()));
        assert_eq!(error_lines(&controller), 0);
    }

    #[test]
    fn test_dev_flavor_uploads_debug_artifact_without_cleanup() {
        let mut controller = Controller::new(Config::default());
        controller.update(ControllerEvent::Selected(selection("dev")));

        let commands = controller.update(done());
        assert_eq!(
            commands,
            vec![PipelineCommand::StartUpload {
                path: PathBuf::from("build/app/outputs/flutter-apk/app-dev-debug.apk")
            }]
        );
        assert_eq!(controller.stage(), PipelineStage::Uploading);
        assert!(controller.history().contains(&PipelineStage::Zipping));

        let commands = controller.update(done());
        assert!(commands.is_empty());
        assert_eq!(controller.stage(), PipelineStage::Done);
        assert_eq!(controller.timings().len(), 3);
    }

    #[test]
    fn test_build_error_fails_once() {
        let mut controller = Controller::new(Config::default());
        controller.update(ControllerEvent::Selected(selection("raf")));
        controller.update(line("FAILURE: Build failed with an exception."));

        let commands = controller.update(stage_event(PipelineEvent::StageError(
            StageError::ExitStatus {
                command: "flutter build apk".to_string(),
                code: Some(1),
            },
        )));

        assert!(commands.is_empty());
        assert_eq!(controller.stage(), PipelineStage::Failed);
        assert_eq!(error_lines(&controller), 1);
        assert!(controller.error().is_some());

        // nothing progresses after failure
        assert!(controller.update(done()).is_empty());
        let late = StageError::Archive(ArchiveError::NoMatch {
            flavor: "raf".to_string(),
        });
        assert!(controller
            .update(stage_event(PipelineEvent::StageError(late)))
            .is_empty());
        assert_eq!(error_lines(&controller), 1);
        assert_eq!(controller.stage(), PipelineStage::Failed);
    }

    #[test]
    fn test_lines_after_failure_still_reach_transcript() {
        let mut controller = Controller::new(Config::default());
        controller.update(ControllerEvent::Selected(selection("raf")));
        controller.update(stage_event(PipelineEvent::StageError(
            StageError::Disconnected {
                stage: PipelineStage::Building,
            },
        )));
        controller.update(line("late output"));

        assert_eq!(controller.transcript().last().map(String::as_str), Some("late output"));
    }

    #[test]
    fn test_links_only_promoted_while_uploading() {
        let mut controller = Controller::new(Config::default());
        controller.update(ControllerEvent::Selected(selection("raf")));
        controller.update(line("DL: https://oshi.at/early/raf.zip"));
        assert!(controller.download_link().is_none());
    }

    #[test]
    fn test_every_transition_reports_status() {
        let mut controller = Controller::new(Config::default());
        let mut seen = 0;

        controller.update(ControllerEvent::Selected(selection("wellcare")));
        for _ in 0..3 {
            assert!(controller.final_outputs().len() > seen);
            seen = controller.final_outputs().len();
            controller.update(done());
        }
        assert!(controller.final_outputs().len() > seen);
        assert_eq!(controller.stage(), PipelineStage::Done);
    }

    #[test]
    fn test_quit_emits_quit_command() {
        let mut controller = Controller::new(Config::default());
        controller.update(ControllerEvent::Selected(selection("raf")));

        assert_eq!(
            controller.update(ControllerEvent::Quit),
            vec![PipelineCommand::Quit]
        );
        assert_eq!(controller.stage(), PipelineStage::Building);
    }

    #[test]
    fn test_cleanup_disabled() {
        let mut config = Config::default();
        config.upload.cleanup_archive = false;
        let mut controller = Controller::new(config);

        controller.update(ControllerEvent::Selected(selection("raf")));
        controller.update(done());
        controller.update(done());
        assert!(controller.update(done()).is_empty());
    }
}

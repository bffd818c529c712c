//! apkdrop pipeline - build, compress and upload stages
//!
//! The pipeline turns a [`BuildSelection`](apkdrop_core::BuildSelection)
//! into three external stages run strictly in order:
//!
//! 1. **Building** runs `flutter build apk` through the [`ProcessRunner`],
//!    streaming merged stdout and stderr line by line.
//! 2. **Zipping** collects the flavor's release APKs into one archive with
//!    the [`Archiver`]. The fast-path flavor skips this and uploads its debug
//!    APK directly.
//! 3. **Uploading** posts the file with an [`Uploader`] and promotes the
//!    download link from the response.
//!
//! The [`Controller`] is a reducer over [`ControllerEvent`]s that decides
//! every transition; the [`PipelineDriver`] runs it against real workers,
//! one mailbox per stage.

pub mod archive;
pub mod build;
pub mod controller;
pub mod driver;
pub mod error;
pub mod event;
pub mod executor;
pub mod reporter;
pub mod runner;
pub mod stage;
pub mod upload;

pub use archive::{ArchiveReport, Archiver};
pub use build::build_command;
pub use controller::{Controller, ControllerEvent, PipelineCommand};
pub use driver::{PipelineDriver, PipelineSummary, StageSummary};
pub use error::{ArchiveError, StageError, UploadError};
pub use event::{mailbox, Mailbox, PipelineEvent, StageSink};
pub use executor::{StageExecutor, ToolchainExecutor};
pub use reporter::{CollectingReporter, PipelineReporter, ReportEvent, TracingReporter};
pub use runner::{CommandSpec, ProcessRunner};
pub use stage::{format_elapsed, PipelineStage, StageTiming};
pub use upload::{extract_download_link, HttpUploader, Uploader};

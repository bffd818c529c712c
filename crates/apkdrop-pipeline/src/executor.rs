//! Stage executors

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use apkdrop_core::config::BuildConfig;
use apkdrop_core::{BuildSelection, Config, Flavor};
use async_trait::async_trait;

use crate::archive::Archiver;
use crate::build::build_command;
use crate::error::{ArchiveError, StageError};
use crate::event::StageSink;
use crate::runner::ProcessRunner;
use crate::upload::{HttpUploader, Uploader};

/// Carries out the work behind each pipeline command.
///
/// Implementations report progress through the sink and return the stage
/// result; the driver sends the terminal event.
#[async_trait]
pub trait StageExecutor: Send + Sync {
    /// Run the build tool for a selection
    async fn build(&self, selection: &BuildSelection, sink: &StageSink) -> Result<(), StageError>;

    /// Compress the flavor's release artifacts into `archive`
    async fn archive(&self, flavor: &Flavor, archive: &Path, sink: &StageSink)
        -> Result<(), StageError>;

    /// Upload a file and forward the response lines
    async fn upload(&self, path: &Path, sink: &StageSink) -> Result<(), StageError>;

    /// Remove a local file
    async fn cleanup(&self, path: &Path) -> io::Result<()>;
}

/// Executor backed by the flutter toolchain, a zip archiver and an HTTP uploader
pub struct ToolchainExecutor {
    build: BuildConfig,
    archiver: Archiver,
    uploader: Arc<dyn Uploader>,
}

impl ToolchainExecutor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            build: config.build.clone(),
            archiver: Archiver::from_config(config),
            uploader: Arc::new(HttpUploader::from_config(&config.upload)),
        }
    }

    /// Replace the uploader
    pub fn with_uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = uploader;
        self
    }
}

#[async_trait]
impl StageExecutor for ToolchainExecutor {
    async fn build(&self, selection: &BuildSelection, sink: &StageSink) -> Result<(), StageError> {
        let command = build_command(selection, &self.build);
        ProcessRunner::run(&command, sink).await
    }

    async fn archive(
        &self,
        flavor: &Flavor,
        archive: &Path,
        sink: &StageSink,
    ) -> Result<(), StageError> {
        sink.line(format!(
            "Collecting {} release artifacts from {}",
            flavor,
            self.archiver.source_dir().display()
        ))
        .await;

        let archiver = self.archiver.clone();
        let flavor = flavor.clone();
        let dest: PathBuf = archive.to_path_buf();
        let report = tokio::task::spawn_blocking(move || archiver.create(&flavor, &dest))
            .await
            .map_err(|e| ArchiveError::Io {
                path: archive.to_path_buf(),
                source: io::Error::other(e),
            })??;

        for entry in &report.entries {
            sink.line(format!("  adding: {}", entry)).await;
        }
        sink.line(format!(
            "Wrote {} ({} files)",
            report.path.display(),
            report.entries.len()
        ))
        .await;
        Ok(())
    }

    async fn upload(&self, path: &Path, sink: &StageSink) -> Result<(), StageError> {
        sink.line(format!(
            "Uploading {} to {}",
            path.display(),
            self.uploader.endpoint()
        ))
        .await;

        let response = self.uploader.upload(path).await?;
        for line in response.lines().filter(|l| !l.trim().is_empty()) {
            sink.line(line).await;
        }
        Ok(())
    }

    async fn cleanup(&self, path: &Path) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploadError;
    use crate::event::{mailbox, PipelineEvent};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct RecordingUploader {
        uploaded: Mutex<Vec<PathBuf>>,
        response: String,
    }

    #[async_trait]
    impl Uploader for RecordingUploader {
        fn endpoint(&self) -> &str {
            "http://uploads.test"
        }

        async fn upload(&self, path: &Path) -> Result<String, UploadError> {
            self.uploaded.lock().unwrap().push(path.to_path_buf());
            Ok(self.response.clone())
        }
    }

    fn config_with_output(dir: &Path) -> Config {
        let mut config = Config::default();
        config.build.output_dir = dir.to_path_buf();
        config
    }

    #[tokio::test]
    async fn test_archive_reports_entries() {
        let out = TempDir::new().unwrap();
        std::fs::write(out.path().join("app-raf-release.apk"), b"apk").unwrap();
        let dest_dir = TempDir::new().unwrap();
        let dest = dest_dir.path().join("raf-build-apk.zip");

        let executor = ToolchainExecutor::from_config(&config_with_output(out.path()));
        let (sink, mut mailbox) = mailbox(16);
        executor
            .archive(&Flavor::parse("raf").unwrap(), &dest, &sink)
            .await
            .unwrap();
        drop(sink);

        let mut lines = Vec::new();
        while let Some(PipelineEvent::Line(line)) = mailbox.recv().await {
            lines.push(line);
        }
        assert!(dest.exists());
        assert!(lines.iter().any(|l| l.contains("app-raf-release.apk")));
    }

    #[tokio::test]
    async fn test_archive_without_matches_fails() {
        let out = TempDir::new().unwrap();
        std::fs::write(out.path().join("app-raf-debug.apk"), b"apk").unwrap();
        let dest_dir = TempDir::new().unwrap();

        let executor = ToolchainExecutor::from_config(&config_with_output(out.path()));
        let (sink, _mailbox) = mailbox(16);
        let err = executor
            .archive(
                &Flavor::parse("raf").unwrap(),
                &dest_dir.path().join("raf-build-apk.zip"),
                &sink,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::Archive(ArchiveError::NoMatch { .. })));
    }

    #[tokio::test]
    async fn test_upload_forwards_response_lines() {
        let uploader = Arc::new(RecordingUploader {
            uploaded: Mutex::new(Vec::new()),
            response: "MANAGE: https://oshi.at/a/x\n\nDL: https://oshi.at/x/y.zip\n".to_string(),
        });
        let executor =
            ToolchainExecutor::from_config(&Config::default()).with_uploader(uploader.clone());

        let (sink, mut mailbox) = mailbox(16);
        executor
            .upload(Path::new("raf-build-apk.zip"), &sink)
            .await
            .unwrap();
        drop(sink);

        let mut lines = Vec::new();
        while let Some(PipelineEvent::Line(line)) = mailbox.recv().await {
            lines.push(line);
        }
        assert_eq!(
            lines,
            vec![
                "Uploading raf-build-apk.zip to http://uploads.test",
                "MANAGE: https://oshi.at/a/x",
                "DL: https://oshi.at/x/y.zip",
            ]
        );
        assert_eq!(
            uploader.uploaded.lock().unwrap().clone(),
            vec![PathBuf::from("raf-build-apk.zip")]
        );
    }
}

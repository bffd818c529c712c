//! Pipeline error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::stage::PipelineStage;

/// Result type alias using StageError
pub type Result<T> = std::result::Result<T, StageError>;

/// Failure of a single pipeline stage
#[derive(Debug, Error)]
pub enum StageError {
    /// Process could not be started
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// A standard stream of the process was not captured
    #[error("Failed to capture {stream} of '{command}'")]
    Pipe {
        command: String,
        stream: &'static str,
    },

    /// Reading process output or waiting for it failed
    #[error("Failed reading output of '{command}': {source}")]
    Stream {
        command: String,
        #[source]
        source: io::Error,
    },

    /// Process ran but reported failure
    #[error("'{command}' {}", describe_exit(.code))]
    ExitStatus { command: String, code: Option<i32> },

    /// Compression failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Upload failed
    #[error(transparent)]
    Upload(#[from] UploadError),

    /// Stage ran longer than the configured limit
    #[error("{stage} stage timed out after {seconds}s")]
    Timeout { stage: PipelineStage, seconds: u64 },

    /// Stage worker went away without reporting a result
    #[error("{stage} stage stopped without reporting a result")]
    Disconnected { stage: PipelineStage },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

/// Errors raised while compressing release artifacts
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Build output directory is missing or holds nothing
    #[error("Build directory not found. Please run flutter build apk first. ({})", .path.display())]
    OutputMissing { path: PathBuf },

    /// Directory exists but no file matches the flavor filter
    #[error("No file generated for flavor: {flavor}")]
    NoMatch { flavor: String },

    /// Reading an artifact or writing the archive failed
    #[error("Failed to write archive {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Zip encoder rejected an entry
    #[error("Failed to write archive {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Errors raised while uploading a file
#[derive(Debug, Error)]
pub enum UploadError {
    /// File to upload could not be opened
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Request could not be sent
    #[error("Failed to send upload request: {0}")]
    Transport(#[source] reqwest::Error),

    /// Endpoint answered with anything but 200
    #[error("Failed to upload file. Status code: {code}")]
    Status { code: u16 },

    /// Response body could not be read
    #[error("Failed to read upload response: {0}")]
    Response(#[source] reqwest::Error),
}

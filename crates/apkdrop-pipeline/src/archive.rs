//! Release artifact compression

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use apkdrop_core::config::Config;
use apkdrop_core::Flavor;
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::ArchiveError;

/// Result of a successful compression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Archive that was written
    pub path: PathBuf,
    /// Entry names in archive order
    pub entries: Vec<String>,
}

/// Collects a flavor's release artifacts into one zip archive
#[derive(Debug, Clone)]
pub struct Archiver {
    source_dir: PathBuf,
    extension: String,
    release_marker: String,
}

impl Archiver {
    pub fn new(
        source_dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        release_marker: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            extension: extension.into(),
            release_marker: release_marker.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.build.output_dir,
            &config.archive.extension,
            &config.archive.release_marker,
        )
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Whether a file name belongs to the flavor's release output
    pub fn matches(&self, file_name: &str, flavor: &Flavor) -> bool {
        file_name.contains(flavor.as_str())
            && file_name.contains(&self.release_marker)
            && file_name.ends_with(&format!(".{}", self.extension))
    }

    /// Release artifacts for a flavor, sorted by file name.
    ///
    /// A missing or empty source directory is reported as
    /// [`ArchiveError::OutputMissing`]; a directory with files but no match
    /// as [`ArchiveError::NoMatch`].
    pub fn matching_artifacts(&self, flavor: &Flavor) -> Result<Vec<PathBuf>, ArchiveError> {
        let missing = || ArchiveError::OutputMissing {
            path: self.source_dir.clone(),
        };

        let entries = fs::read_dir(&self.source_dir).map_err(|_| missing())?;

        let mut seen_any = false;
        let mut matched = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ArchiveError::Io {
                path: self.source_dir.clone(),
                source,
            })?;
            seen_any = true;

            let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let name = entry.file_name();
            if self.matches(&name.to_string_lossy(), flavor) {
                matched.push(entry.path());
            }
        }

        if !seen_any {
            return Err(missing());
        }
        if matched.is_empty() {
            return Err(ArchiveError::NoMatch {
                flavor: flavor.to_string(),
            });
        }

        matched.sort();
        debug!(flavor = %flavor, count = matched.len(), "matched release artifacts");
        Ok(matched)
    }

    /// Write every matching artifact into `dest` using deflate compression.
    ///
    /// Entries keep their original base names. The archive is only created
    /// once at least one artifact matched, and is removed again if writing
    /// fails partway.
    pub fn create(&self, flavor: &Flavor, dest: &Path) -> Result<ArchiveReport, ArchiveError> {
        let artifacts = self.matching_artifacts(flavor)?;
        info!(flavor = %flavor, archive = %dest.display(), count = artifacts.len(), "compressing artifacts");

        let entries = write_or_discard(&artifacts, dest)?;
        Ok(ArchiveReport {
            path: dest.to_path_buf(),
            entries,
        })
    }
}

fn write_or_discard(artifacts: &[PathBuf], dest: &Path) -> Result<Vec<String>, ArchiveError> {
    let result = write_archive(artifacts, dest);
    if result.is_err() && dest.exists() {
        if let Err(e) = fs::remove_file(dest) {
            warn!(archive = %dest.display(), error = %e, "failed to remove partial archive");
        }
    }
    result
}

fn write_archive(artifacts: &[PathBuf], dest: &Path) -> Result<Vec<String>, ArchiveError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source: io::Error| ArchiveError::Io { path, source }
    };
    let zip_err = |source: zip::result::ZipError| ArchiveError::Zip {
        path: dest.to_path_buf(),
        source,
    };

    let file = File::create(dest).map_err(io_err(dest))?;
    // dropping the writer on an error path also finalizes it
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut entries = Vec::with_capacity(artifacts.len());
    for artifact in artifacts {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        writer.start_file(name.as_str(), options).map_err(zip_err)?;
        let mut input = File::open(artifact).map_err(io_err(artifact))?;
        io::copy(&mut input, &mut writer).map_err(io_err(artifact))?;
        debug!(entry = %name, "added archive entry");
        entries.push(name);
    }

    writer.finish().map_err(zip_err)?;
    Ok(entries)
}

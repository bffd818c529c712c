//! Configuration types

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::SelectionError;
use crate::types::Flavor;

/// Placeholder replaced with the flavor name in path templates
pub const FLAVOR_PLACEHOLDER: &str = "{flavor}";

/// Main configuration for apkdrop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Flavors offered by the selection front-end
    pub flavors: Vec<Flavor>,

    /// Build tool configuration
    pub build: BuildConfig,

    /// Archive configuration
    pub archive: ArchiveConfig,

    /// Upload configuration
    pub upload: UploadConfig,

    /// Pipeline behaviour
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            flavors: ["dev", "raf", "wellcare"]
                .into_iter()
                .filter_map(|name| Flavor::parse(name).ok())
                .collect(),
            build: BuildConfig::default(),
            archive: ArchiveConfig::default(),
            upload: UploadConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Names of the configured flavors, in display order
    pub fn flavor_names(&self) -> Vec<&str> {
        self.flavors.iter().map(Flavor::as_str).collect()
    }

    /// Resolve a user-supplied flavor name against the configured list
    pub fn resolve_flavor(&self, name: &str) -> Result<Flavor, SelectionError> {
        let flavor = Flavor::parse(name)?;
        if self.flavors.contains(&flavor) {
            Ok(flavor)
        } else {
            Err(SelectionError::UnknownFlavor {
                flavor: flavor.to_string(),
                available: self.flavor_names().join(", "),
            })
        }
    }

    /// Path of the archive written for a flavor
    pub fn archive_path(&self, flavor: &Flavor) -> PathBuf {
        PathBuf::from(expand_flavor(&self.archive.name_template, flavor))
    }

    /// Path of the debug artifact uploaded on the fast path
    pub fn debug_artifact_path(&self, flavor: &Flavor) -> PathBuf {
        PathBuf::from(expand_flavor(&self.upload.debug_artifact, flavor))
    }

    /// Whether the flavor skips archiving and uploads its debug artifact
    pub fn is_fast_path(&self, flavor: &Flavor) -> bool {
        self.upload.fast_path_flavor.as_ref() == Some(flavor)
    }
}

fn expand_flavor(template: &str, flavor: &Flavor) -> String {
    template.replace(FLAVOR_PLACEHOLDER, flavor.as_str())
}

/// Build tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Path to the flutter executable
    pub flutter_path: String,

    /// Directory the build tool writes APKs to
    pub output_dir: PathBuf,

    /// Extra arguments appended to the build invocation
    pub extra_args: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            flutter_path: "flutter".to_string(),
            output_dir: PathBuf::from("build/app/outputs/flutter-apk"),
            extra_args: Vec::new(),
        }
    }
}

/// Archive configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Archive file name, `{flavor}` is replaced with the flavor
    pub name_template: String,

    /// Artifact extension without the leading dot
    pub extension: String,

    /// Word a file name must contain to be archived
    pub release_marker: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            name_template: "{flavor}-build-apk.zip".to_string(),
            extension: "apk".to_string(),
            release_marker: "release".to_string(),
        }
    }
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Endpoint receiving the multipart upload
    pub endpoint: String,

    /// Name of the multipart field holding the file
    pub field_name: String,

    /// Flavor that uploads its debug artifact without archiving
    pub fast_path_flavor: Option<Flavor>,

    /// Debug artifact path, `{flavor}` is replaced with the flavor
    pub debug_artifact: String,

    /// Substring identifying a file link in the endpoint response
    pub link_marker: String,

    /// Remove the local archive after a successful upload
    pub cleanup_archive: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://oshi.at".to_string(),
            field_name: "f".to_string(),
            fast_path_flavor: Flavor::parse("dev").ok(),
            debug_artifact: "build/app/outputs/flutter-apk/app-{flavor}-debug.apk".to_string(),
            link_marker: "https://oshi.at".to_string(),
            cleanup_archive: true,
        }
    }
}

/// Pipeline behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fail a stage that runs longer than this many seconds
    pub stage_timeout_secs: Option<u64>,

    /// Capacity of the per-stage line mailbox
    pub mailbox_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: None,
            mailbox_capacity: 256,
        }
    }
}

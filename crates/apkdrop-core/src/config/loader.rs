//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Parse and validate one configuration file.
///
/// `.toml` files are read as TOML, everything else as YAML.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()).into());
    }
    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let config: Config = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(ConfigError::TomlError)?,
        _ => serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?,
    };
    validate_config(&config)?;

    debug!(path = %path.display(), flavors = config.flavors.len(), "config loaded");
    Ok(config)
}

/// Nearest configuration file at or above `start_dir`.
///
/// Each directory is checked for every known file name, directly and under
/// `.github/`, before moving to its parent.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    start_dir
        .ancestors()
        .flat_map(|dir| {
            config_file_names()
                .into_iter()
                .flat_map(move |name| [dir.join(name), dir.join(".github").join(name)])
        })
        .find(|candidate| candidate.is_file())
}

/// Resolve the configuration for a run.
///
/// An `explicit` path must exist. Otherwise the nearest file above `dir` is
/// used, and built-in defaults when there is none. A file that fails to
/// parse or validate is always an error.
pub fn resolve_config(explicit: Option<&Path>, dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match find_config(dir) {
            Some(found) => found,
            None => {
                warn!(dir = %dir.display(), "no config found, using defaults");
                return Ok((Config::default(), None));
            }
        },
    };

    info!(path = %path.display(), "using config file");
    let config = load_config(&path)?;
    Ok((config, Some(path)))
}

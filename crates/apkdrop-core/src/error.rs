//! Error types for apkdrop

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using ApkdropError
pub type Result<T> = std::result::Result<T, ApkdropError>;

/// Main error type for apkdrop core operations
#[derive(Debug, Error)]
pub enum ApkdropError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid build selection
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while turning user answers into a build selection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// Flavor name is empty or contains characters the build tool rejects
    #[error("Invalid flavor '{0}': use letters, digits, '-' or '_'")]
    InvalidFlavor(String),

    /// Flavor is valid but not one of the configured flavors
    #[error("Unknown flavor '{flavor}'. Configured flavors: {available}")]
    UnknownFlavor { flavor: String, available: String },

    /// Release mode is not recognized
    #[error("Invalid build mode '{0}': expected 'release' or 'debug'")]
    InvalidMode(String),

    /// Not every question has an answer yet
    #[error("Choose all options to continue")]
    Incomplete,
}

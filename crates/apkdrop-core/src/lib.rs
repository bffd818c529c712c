//! apkdrop core - shared types and configuration
//!
//! This crate holds the build selection types handed from the selection
//! front-end to the pipeline, the configuration file format, and the error
//! types shared by the other workspace crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{ApkdropError, ConfigError, Result, SelectionError};
pub use types::{BuildMode, BuildSelection, Flavor};

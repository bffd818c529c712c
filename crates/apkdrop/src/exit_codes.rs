//! Exit codes for the CLI

use apkdrop_core::{ApkdropError, ConfigError};

use crate::cli::CommandError;

/// Success
pub const SUCCESS: u8 = 0;

/// Pipeline or command failure
pub const ERROR: u8 = 1;

/// Configuration error
pub const CONFIG_ERROR: u8 = 2;

/// User cancelled or interrupted
pub const CANCELLED: u8 = 130;

/// Exit code for an error returned by a command
pub fn for_error(err: &anyhow::Error) -> u8 {
    if let Some(err) = err.downcast_ref::<CommandError>() {
        return match err {
            CommandError::Cancelled | CommandError::Interrupted => CANCELLED,
            CommandError::PipelineFailed(_) => ERROR,
        };
    }

    if err.downcast_ref::<ConfigError>().is_some()
        || matches!(err.downcast_ref::<ApkdropError>(), Some(ApkdropError::Config(_)))
    {
        return CONFIG_ERROR;
    }

    ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_config_errors_map_to_config_code() {
        let err: anyhow::Error =
            ApkdropError::from(ConfigError::NotFound(PathBuf::from("apkdrop.yaml"))).into();
        assert_eq!(for_error(&err), CONFIG_ERROR);

        let err: anyhow::Error = ConfigError::InvalidValue {
            field: "upload.endpoint".to_string(),
            message: "must be an http(s) URL".to_string(),
        }
        .into();
        assert_eq!(for_error(&err), CONFIG_ERROR);
    }

    #[test]
    fn test_command_errors() {
        assert_eq!(for_error(&CommandError::Cancelled.into()), CANCELLED);
        assert_eq!(for_error(&CommandError::Interrupted.into()), CANCELLED);
        assert_eq!(
            for_error(&CommandError::PipelineFailed("build".to_string()).into()),
            ERROR
        );
        assert_eq!(for_error(&anyhow::anyhow!("boom")), ERROR);
    }
}

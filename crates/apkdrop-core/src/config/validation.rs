//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::{Config, FLAVOR_PLACEHOLDER};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_flavors(config)?;
    validate_build(config)?;
    validate_archive(config)?;
    validate_upload(config)?;
    validate_pipeline(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> crate::error::ApkdropError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.into(),
    }
    .into()
}

fn validate_flavors(config: &Config) -> Result<()> {
    if config.flavors.is_empty() {
        return Err(invalid("flavors", "at least one flavor is required"));
    }

    for (i, flavor) in config.flavors.iter().enumerate() {
        if config.flavors[..i].contains(flavor) {
            return Err(invalid(
                &format!("flavors[{}]", i),
                format!("duplicate flavor '{}'", flavor),
            ));
        }
    }

    Ok(())
}

fn validate_build(config: &Config) -> Result<()> {
    if config.build.flutter_path.trim().is_empty() {
        return Err(invalid("build.flutter_path", "cannot be empty"));
    }

    Ok(())
}

fn validate_archive(config: &Config) -> Result<()> {
    if !config.archive.name_template.contains(FLAVOR_PLACEHOLDER) {
        return Err(invalid(
            "archive.name_template",
            "must contain {flavor} placeholder",
        ));
    }

    if config.archive.extension.is_empty() || config.archive.extension.starts_with('.') {
        return Err(invalid(
            "archive.extension",
            "must be a non-empty extension without the leading dot",
        ));
    }

    if config.archive.release_marker.is_empty() {
        return Err(invalid("archive.release_marker", "cannot be empty"));
    }

    Ok(())
}

fn validate_upload(config: &Config) -> Result<()> {
    let endpoint = &config.upload.endpoint;
    if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
        return Err(invalid("upload.endpoint", "must be an http(s) URL"));
    }

    if config.upload.field_name.is_empty() {
        return Err(invalid("upload.field_name", "cannot be empty"));
    }

    if !config.upload.debug_artifact.contains(FLAVOR_PLACEHOLDER) {
        return Err(invalid(
            "upload.debug_artifact",
            "must contain {flavor} placeholder",
        ));
    }

    Ok(())
}

fn validate_pipeline(config: &Config) -> Result<()> {
    if config.pipeline.mailbox_capacity == 0 {
        return Err(invalid("pipeline.mailbox_capacity", "must be at least 1"));
    }

    if config.pipeline.stage_timeout_secs == Some(0) {
        return Err(invalid(
            "pipeline.stage_timeout_secs",
            "must be at least 1 second; omit it to disable the timeout",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Flavor;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_flavors() {
        let mut config = Config::default();
        config.flavors.clear();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_flavor() {
        let mut config = Config::default();
        config.flavors.push(Flavor::parse("dev").unwrap());
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_archive_template_placeholder() {
        let mut config = Config::default();
        config.archive.name_template = "build-apk.zip".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_endpoint_scheme() {
        let mut config = Config::default();
        config.upload.endpoint = "oshi.at".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_fast_path_flavor_may_be_unlisted() {
        let mut config = Config::default();
        config.flavors = vec![Flavor::parse("qa").unwrap()];
        assert!(validate_config(&config).is_ok());
        assert!(!config.is_fast_path(&config.flavors[0]));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.pipeline.stage_timeout_secs = Some(0);
        assert!(validate_config(&config).is_err());
    }
}

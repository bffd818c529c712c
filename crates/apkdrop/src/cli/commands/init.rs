//! Init command

use std::path::{Path, PathBuf};

use clap::Args;
use dialoguer::{Confirm, Select};
use tracing::info;

use apkdrop_core::config::{
    validate_config, Config, DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_TOML, DEFAULT_CONFIG_YAML,
};

use crate::cli::{output, Cli, CommandError};

/// Write a default apkdrop configuration
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Use defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// On-disk format of the generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    const ALL: [ConfigFormat; 2] = [ConfigFormat::Yaml, ConfigFormat::Toml];

    fn label(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
        }
    }

    fn default_file_name(self) -> &'static str {
        match self {
            Self::Yaml => DEFAULT_CONFIG_YAML,
            Self::Toml => DEFAULT_CONFIG_TOML,
        }
    }

    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "toml" => Some(Self::Toml),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

impl InitCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, yes = self.yes, "executing init command");
        let cwd = std::env::current_dir()?;

        let format = match self.output.as_deref().and_then(ConfigFormat::from_path) {
            Some(format) => format,
            None if self.yes => ConfigFormat::Yaml,
            None => {
                let labels: Vec<&str> = ConfigFormat::ALL.iter().map(|f| f.label()).collect();
                let index = Select::new()
                    .with_prompt("Configuration format")
                    .items(&labels)
                    .default(0)
                    .interact_opt()?
                    .ok_or(CommandError::Cancelled)?;
                ConfigFormat::ALL[index]
            }
        };

        let config_path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(format.default_file_name()));

        if config_path.exists() && !self.force {
            if self.yes {
                anyhow::bail!(
                    "Configuration file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
            }

            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "Configuration file already exists at {}. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;

            if !overwrite {
                output::warning("Aborted.");
                return Ok(());
            }
        }

        let content = render_config(format)?;
        std::fs::write(&config_path, &content)?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {}",
                output::path_style().apply_to(config_path.display())
            ));
            println!();
            println!("{}", output::header("Next steps:"));
            println!("  1. Edit the flavor list and upload settings in {}", config_path.display());
            println!(
                "  2. Run {} from your Flutter project",
                output::path_style().apply_to("apkdrop")
            );
        }

        Ok(())
    }
}

/// Default configuration in the requested format
fn render_config(format: ConfigFormat) -> anyhow::Result<String> {
    let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
    validate_config(&config)?;

    Ok(match format {
        ConfigFormat::Yaml => DEFAULT_CONFIG_TEMPLATE.to_string(),
        ConfigFormat::Toml => {
            let body = toml::to_string_pretty(&config)?;
            format!("# apkdrop configuration\n\n{}", body)
        }
    })
}

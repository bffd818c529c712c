//! CLI definition and command handling

pub mod commands;
pub mod output;
pub mod select;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use thiserror::Error;

use apkdrop_core::config::resolve_config;
use apkdrop_core::Config;

use commands::{CompletionsCommand, InitCommand, RunCommand, UploadCommand};

/// apkdrop - build, compress and share Flutter APKs
#[derive(Debug, Parser)]
#[command(name = "apkdrop")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<PathBuf>,

    /// Configuration file (searched for when omitted)
    #[arg(long, global = true, env = "APKDROP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Select a flavor and mode, then build, compress and upload (default)
    Run(RunCommand),

    /// Upload a single file and print its download link
    Upload(UploadCommand),

    /// Write a default configuration file
    Init(InitCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Outcomes that end a command without a lower-level error
#[derive(Debug, Error)]
pub enum CommandError {
    /// User backed out of a prompt
    #[error("Cancelled")]
    Cancelled,

    /// Quit was requested while the pipeline was running
    #[error("Pipeline interrupted")]
    Interrupted,

    /// A pipeline stage failed
    #[error("Pipeline failed: {0}")]
    PipelineFailed(String),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> anyhow::Result<()> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)
                .with_context(|| format!("Failed to change directory to {}", dir.display()))?;
        }

        match self.command {
            Some(Commands::Run(ref cmd)) => cmd.execute(&self),
            Some(Commands::Upload(ref cmd)) => cmd.execute(&self),
            Some(Commands::Init(ref cmd)) => cmd.execute(&self),
            Some(Commands::Completions(ref cmd)) => cmd.execute(&self),
            None => RunCommand::default().execute(&self),
        }
    }

    /// Load the configuration named by `--config`, or search from the
    /// working directory and fall back to defaults
    pub fn load_config(&self) -> apkdrop_core::Result<(Config, Option<PathBuf>)> {
        resolve_config(self.config.as_deref(), &std::env::current_dir()?)
    }

    /// Whether human-readable progress should be printed
    pub fn shows_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}

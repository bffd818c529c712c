//! Run command: select, build, compress and upload

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing::{debug, info};

use apkdrop_core::config::validate_config;
use apkdrop_core::{BuildMode, Config};
use apkdrop_pipeline::{PipelineDriver, PipelineReporter, PipelineSummary, TracingReporter};

use crate::cli::output::{self, ConsoleReporter};
use crate::cli::select::{prompt_selection, SelectionFlow};
use crate::cli::{Cli, CommandError, OutputFormat};

/// Select a flavor and build mode, then build, compress and upload
#[derive(Debug, Default, Args)]
pub struct RunCommand {
    /// Flavor to build (prompted when omitted)
    #[arg(long)]
    pub flavor: Option<String>,

    /// Build mode: release or debug (prompted when omitted)
    #[arg(long)]
    pub mode: Option<String>,

    /// Upload endpoint, overrides the configuration
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Skip the build tool check
    #[arg(long)]
    pub skip_checks: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl RunCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let (mut config, config_path) = cli.load_config()?;
        debug!(config = ?config_path, "configuration resolved");

        if let Some(endpoint) = &self.endpoint {
            config.upload.endpoint = endpoint.clone();
            validate_config(&config)?;
        }

        if !self.skip_checks {
            preflight(&config)?;
        }

        let flavor = self
            .flavor
            .as_deref()
            .map(|name| config.resolve_flavor(name))
            .transpose()?;
        let mode = self
            .mode
            .as_deref()
            .map(str::parse::<BuildMode>)
            .transpose()?;

        let flow = SelectionFlow::with_answers(flavor, mode);
        let selection = prompt_selection(&config, flow, self.yes)?;
        info!(selection = %selection, "executing run command");

        let runtime = tokio::runtime::Runtime::new()?;
        let summary = runtime.block_on(self.execute_async(cli, config, selection))?;
        runtime.shutdown_background();

        report_summary(cli, &summary)?;

        if summary.interrupted {
            return Err(CommandError::Interrupted.into());
        }
        if !summary.succeeded() {
            let reason = summary
                .error
                .unwrap_or_else(|| format!("stopped while {}", summary.stage));
            return Err(CommandError::PipelineFailed(reason).into());
        }
        Ok(())
    }

    async fn execute_async(
        &self,
        cli: &Cli,
        config: Config,
        selection: apkdrop_core::BuildSelection,
    ) -> anyhow::Result<PipelineSummary> {
        let console = cli.shows_progress().then(|| Arc::new(ConsoleReporter::new()));
        let reporter: Arc<dyn PipelineReporter> = match &console {
            Some(console) => console.clone() as Arc<dyn PipelineReporter>,
            None => Arc::new(TracingReporter),
        };

        let driver = PipelineDriver::new(config).with_reporter(reporter);
        let summary = driver.run(selection, quit_signal()).await;

        if let Some(console) = console {
            console.finish();
        }
        Ok(summary)
    }
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn quit_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Fail early when the build tool is not installed
fn preflight(config: &Config) -> anyhow::Result<()> {
    let tool = &config.build.flutter_path;
    let path = which::which(tool).with_context(|| {
        format!(
            "'{}' not found. Install Flutter (https://docs.flutter.dev/get-started/install) \
             or set build.flutter_path in the configuration",
            tool
        )
    })?;
    debug!(tool = %tool, path = %path.display(), "build tool found");
    Ok(())
}

fn report_summary(cli: &Cli, summary: &PipelineSummary) -> anyhow::Result<()> {
    if cli.format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }

    println!();
    println!("{}", output::header(&format!("apkdrop: {}", summary.selection)));
    for line in &summary.final_outputs {
        println!("  {}", output::final_output_line(line));
    }
    if summary.interrupted {
        output::warning(&format!("Interrupted while {}", summary.stage));
    }
    Ok(())
}

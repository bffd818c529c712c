//! Shell completions

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use tracing::info;

use crate::cli::output;
use crate::cli::Cli;

/// Generate shell completions
#[derive(Debug, Args)]
pub struct CompletionsCommand {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl CompletionsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(shell = %self.shell, "generating completions");

        match &self.output {
            Some(path) => {
                let mut file = io::BufWriter::new(std::fs::File::create(path)?);
                write_completions(self.shell, &mut file);
                file.flush()?;
                if !cli.quiet {
                    output::success(&format!(
                        "Completions written to {}",
                        output::path_style().apply_to(path.display())
                    ));
                }
            }
            None => write_completions(self.shell, &mut io::stdout()),
        }

        Ok(())
    }
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
}

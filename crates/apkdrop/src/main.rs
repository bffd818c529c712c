//! apkdrop - build, compress and share Flutter APKs

mod cli;
mod exit_codes;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::{output, Cli};

/// Log file written to the working directory
const LOG_FILE: &str = "debug.log";

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    match cli.execute() {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(err) => {
            let code = exit_codes::for_error(&err);
            if code != exit_codes::CANCELLED {
                output::error(&format!("{:#}", err));
            }
            tracing::debug!(code, error = %err, "exiting with error");
            ExitCode::from(code)
        }
    }
}

/// Set up tracing with two layers:
/// - Console: controlled by RUST_LOG (default: warn, `--verbose`: debug)
/// - File: always debug-level JSON to `debug.log` in the working directory
fn init_tracing(verbose: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let console_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let file_appender = tracing_appender::rolling::never(".", LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_target(true)
                .with_filter(EnvFilter::new("debug")),
        )
        .init();

    guard
}

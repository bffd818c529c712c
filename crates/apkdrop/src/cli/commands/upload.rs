//! Upload command

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use serde::Serialize;
use tracing::info;

use apkdrop_core::config::validate_config;
use apkdrop_pipeline::{extract_download_link, format_elapsed, HttpUploader, Uploader};

use crate::cli::output;
use crate::cli::{Cli, OutputFormat};

/// Upload a single file and print its download link
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// File to upload
    pub file: PathBuf,

    /// Upload endpoint, overrides the configuration
    #[arg(long)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadReport {
    file: PathBuf,
    endpoint: String,
    elapsed_ms: u64,
    download_link: Option<String>,
    response: Vec<String>,
}

impl UploadCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let (mut config, _) = cli.load_config()?;
        if let Some(endpoint) = &self.endpoint {
            config.upload.endpoint = endpoint.clone();
            validate_config(&config)?;
        }

        let uploader = HttpUploader::from_config(&config.upload);
        info!(
            file = %self.file.display(),
            endpoint = uploader.endpoint(),
            "executing upload command"
        );
        if cli.shows_progress() {
            output::info(&format!(
                "Uploading {} to {}",
                output::path_style().apply_to(self.file.display()),
                uploader.endpoint()
            ));
        }

        let started = Instant::now();
        let body = uploader.upload(&self.file).await?;
        let elapsed = started.elapsed();

        let response: Vec<String> = body
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        let download_link = response
            .iter()
            .find_map(|line| extract_download_link(line, &config.upload.link_marker));

        if cli.format == OutputFormat::Json {
            let report = UploadReport {
                file: self.file.clone(),
                endpoint: uploader.endpoint().to_string(),
                elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                download_link,
                response,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if !cli.quiet {
            output::success("File uploaded successfully. ✅");
            let elapsed_line = format!("Elapsed time: {}", format_elapsed(elapsed));
            println!("  {}", output::final_output_line(&elapsed_line));
            match &download_link {
                Some(link) => {
                    let link_line = format!("File link: {}", link);
                    println!("  {}", output::final_output_line(&link_line));
                }
                None => {
                    output::warning("No download link found in the response:");
                    for line in &response {
                        println!("  {}", line);
                    }
                }
            }
        } else if let Some(link) = download_link {
            println!("{}", link);
        }

        Ok(())
    }
}

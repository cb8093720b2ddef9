//! CodeAtlas CLI entry point.
//!
//! Initializes structured logging, parses arguments, and runs one
//! analysis. The report goes to stdout or a file; typed failures are
//! printed as their wire-level error body on stderr.

use anyhow::Result;
use codeatlas::cli::{parse_args, Commands, OutputFormat};
use codeatlas::{analyze, AnalysisRequest, AtlasConfig, CancelFlag};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = parse_args();

    match cli.command {
        Commands::Analyze {
            url,
            branch,
            output,
            format,
        } => run_analyze(url, branch, output, format),
    }
}

fn run_analyze(
    url: String,
    branch: Option<String>,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let config = AtlasConfig::from_env();
    let mut request = AnalysisRequest::new(url);
    if let Some(branch) = branch {
        request = request.with_branch(branch);
    }

    match analyze(&config, &request, &CancelFlag::new()) {
        Ok(report) => {
            let rendered = match format {
                OutputFormat::Json => serde_json::to_string_pretty(&report)?,
            };
            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        fs::create_dir_all(parent)?;
                    }
                    fs::write(path, rendered)?;
                }
                None => println!("{rendered}"),
            }
            Ok(())
        }
        Err(err) => {
            let body = serde_json::to_string(&err.to_body())?;
            eprintln!("{body}");
            std::process::exit(1);
        }
    }
}

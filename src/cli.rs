use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "codeatlas")]
#[command(about = "Dependency graph and cycle analysis for remote repositories", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a remote repository and emit the report
    Analyze {
        /// Repository URL (https, git, ssh, or scp-style)
        url: String,

        /// Branch to fetch (defaults to the remote's default branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

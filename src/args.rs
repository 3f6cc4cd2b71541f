use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "critical-page")]
#[command(about = "Generates per-template critical CSS from rendered pages")]
#[command(version)]
pub struct Args {
    /// Config file, relative to the project root unless absolute
    #[arg(short, long, default_value = critical_page::config::DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Project root all configured paths are resolved against
    #[arg(short, long, default_value = ".")]
    pub project_root: PathBuf,

    /// Base URL to fetch pages from (overrides config and CRITICAL_BASE_URL)
    #[arg(short, long)]
    pub base_url: Option<String>,

    /// Output directory for the generated files
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Request timeout in seconds (no timeout when omitted)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

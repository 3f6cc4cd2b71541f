use clap::Parser;
use critical_page::{CriticalConfig, Generator, RunSummary};
use std::process::ExitCode;

mod args;
use args::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config_path = if args.config.is_absolute() {
        args.config.clone()
    } else {
        args.project_root.join(&args.config)
    };

    let mut config = if config_path.exists() {
        match CriticalConfig::from_file(&config_path) {
            Ok(config) => config,
            Err(e) => {
                ::log::error!("Failed to load {}: {}", config_path.display(), e);
                return ExitCode::from(2);
            }
        }
    } else {
        ::log::warn!("No config at {}, using defaults", config_path.display());
        CriticalConfig::default()
    };

    config = config.with_env_overrides();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(output_dir) = args.output_dir {
        config.output_dir = output_dir;
    }

    let resolved = match config.resolve(&args.project_root) {
        Ok(resolved) => resolved,
        Err(e) => {
            ::log::error!("{}", e);
            return ExitCode::from(2);
        }
    };

    ::log::info!("Fetching pages from {}", resolved.base_url);

    let mut generator = Generator::new(resolved);
    if let Some(timeout) = args.timeout {
        generator = generator.with_request_timeout(timeout);
    }

    let start_time = std::time::Instant::now();
    let summary = match generator.run().await {
        Ok(summary) => summary,
        Err(e) => {
            ::log::error!("Critical CSS generation aborted: {}", e);
            return ExitCode::from(2);
        }
    };

    if args.json {
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => ::log::error!("Failed to serialize summary: {}", e),
        }
    } else {
        print_summary(&summary);
    }
    ::log::debug!("Finished in {:.2} seconds", start_time.elapsed().as_secs_f64());

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_summary(summary: &RunSummary) {
    println!("Generated: {}", summary.successful);
    println!("Failed: {}", summary.failed);
    for failure in summary.failures() {
        println!(
            "  {}: {}",
            failure.page.template,
            failure.error.as_deref().unwrap_or("unknown error")
        );
    }
}

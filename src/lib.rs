pub mod assets;
pub mod config;
pub mod engine;
pub mod error;
pub mod fetchers;
pub mod filter;
pub mod html;
pub mod pipeline;
pub mod results;
pub mod utils;

#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use config::{CriticalConfig, PageSpec, ResolvedConfig};
pub use error::{CriticalError, Result};
pub use results::{PageResult, RunSummary};

use engine::InlineEngine;
use fetchers::HttpFetcher;
use pipeline::Pipeline;
use std::time::Duration;

/// Builder for a critical CSS run over the configured pages
pub struct Generator {
    config: ResolvedConfig,
    request_timeout: Option<Duration>,
}

impl Generator {
    /// Create a generator for an already resolved configuration
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            request_timeout: None,
        }
    }

    /// Give up on page fetches that take longer than this
    pub fn with_request_timeout(mut self, timeout_seconds: u64) -> Self {
        self.request_timeout = Some(Duration::from_secs(timeout_seconds));
        self
    }

    /// Fetch every page over HTTP and write its critical CSS
    pub async fn run(self) -> Result<RunSummary> {
        let fetcher = match self.request_timeout {
            Some(timeout) => HttpFetcher::with_timeout(timeout)?,
            None => HttpFetcher::new()?,
        };
        let engine = InlineEngine::new(
            &self.config.public_dir,
            &self.config.public_path,
            self.config.critical_options.clone(),
        )?;

        Pipeline::new(self.config, fetcher, engine).run().await
    }
}

/// Run the pipeline with the default HTTP fetcher and extraction engine
pub async fn generate(config: ResolvedConfig) -> Result<RunSummary> {
    Generator::new(config).run().await
}

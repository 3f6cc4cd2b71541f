use crate::assets::{CssAssetInfo, locate_css_asset};
use crate::config::{PageSpec, ResolvedConfig};
use crate::engine::CriticalEngine;
use crate::error::{CriticalError, Result};
use crate::fetchers::HtmlFetcher;
use crate::html::{extract_critical_css, sanitize};
use crate::results::{PageResult, RunSummary};
use crate::utils::{format_size_kb, output_path, page_url};
use std::fmt;

/// Where a page is in its processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStage {
    Pending,
    Fetching,
    Sanitizing,
    Extracting,
    ParsingOutput,
    Writing,
    Succeeded,
    Failed,
}

impl fmt::Display for PageStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PageStage::Pending => "pending",
            PageStage::Fetching => "fetching",
            PageStage::Sanitizing => "sanitizing",
            PageStage::Extracting => "extracting",
            PageStage::ParsingOutput => "parsing output",
            PageStage::Writing => "writing",
            PageStage::Succeeded => "succeeded",
            PageStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Generates one critical CSS file per configured page, one page at a time
pub struct Pipeline<F, E> {
    config: ResolvedConfig,
    fetcher: F,
    engine: E,
}

impl<F: HtmlFetcher, E: CriticalEngine> Pipeline<F, E> {
    pub fn new(config: ResolvedConfig, fetcher: F, engine: E) -> Self {
        Self {
            config,
            fetcher,
            engine,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Process every page in order
    ///
    /// Fails before any page is processed when no stylesheet can be located or
    /// the output directory cannot be created. Page failures are recorded in
    /// the summary instead.
    pub async fn run(&self) -> Result<RunSummary> {
        let asset = locate_css_asset(
            &self.config.project_root,
            &self.config.manifest_path,
            &self.config.css_entry,
        )
        .await?;

        tokio::fs::create_dir_all(&self.config.output_dir)
            .await
            .map_err(|source| CriticalError::OutputDir {
                path: self.config.output_dir.clone(),
                source,
            })?;

        ::log::info!(
            "Generating critical CSS for {} pages into {}",
            self.config.pages.len(),
            self.config.output_dir.display()
        );

        let mut results = Vec::with_capacity(self.config.pages.len());
        for page in &self.config.pages {
            results.push(self.process_page(page, &asset).await);
        }

        let summary = RunSummary::from_results(results);
        ::log::info!(
            "Critical CSS complete - {} generated, {} failed",
            summary.successful,
            summary.failed
        );
        Ok(summary)
    }

    /// Process a single page, turning any failure into a failed result
    pub async fn process_page(&self, page: &PageSpec, asset: &CssAssetInfo) -> PageResult {
        let url = page_url(&self.config.base_url, &page.uri);
        ::log::info!("Processing {} ({})", page.template, url);
        log_stage(page, PageStage::Pending);

        match self.generate_page(page, &url, asset).await {
            Ok(size) => {
                log_stage(page, PageStage::Succeeded);
                ::log::info!("Wrote critical CSS for {} ({} KB)", page.template, size);
                PageResult::succeeded(page.clone(), size)
            }
            Err(e) => {
                log_stage(page, PageStage::Failed);
                ::log::error!("Failed to generate critical CSS for {}: {}", page.template, e);
                PageResult::failed(page.clone(), e.to_string())
            }
        }
    }

    async fn generate_page(&self, page: &PageSpec, url: &str, asset: &CssAssetInfo) -> Result<String> {
        log_stage(page, PageStage::Fetching);
        let html = self.fetcher.fetch(url).await?;

        log_stage(page, PageStage::Sanitizing);
        let sanitized = sanitize(&html, &asset.href);

        log_stage(page, PageStage::Extracting);
        let processed = self.engine.process(&sanitized).await?;

        log_stage(page, PageStage::ParsingOutput);
        let css = extract_critical_css(&processed);
        if css.is_empty() {
            return Err(CriticalError::NoCriticalCss);
        }

        log_stage(page, PageStage::Writing);
        let path = output_path(&self.config.output_dir, &page.template);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CriticalError::io(parent, e))?;
        }
        tokio::fs::write(&path, css.as_bytes())
            .await
            .map_err(|e| CriticalError::io(&path, e))?;

        let written = tokio::fs::metadata(&path)
            .await
            .map_err(|e| CriticalError::io(&path, e))?;
        Ok(format_size_kb(written.len()))
    }
}

fn log_stage(page: &PageSpec, stage: PageStage) {
    ::log::debug!("[{}] {}", page.template, stage);
}

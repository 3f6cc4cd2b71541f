use crate::engine::EngineOptions;
use crate::error::{CriticalError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Default config file name looked up in the project root
pub const DEFAULT_CONFIG_FILE: &str = "critical.config.json";

/// Environment variable that overrides `base_url`
pub const BASE_URL_ENV: &str = "CRITICAL_BASE_URL";

/// A page to fetch and the template name its critical CSS is written under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    /// URL path appended to the base URL
    pub uri: String,

    /// Output artifact name, shared by pages with the same layout
    pub template: String,
}

impl PageSpec {
    pub fn new(uri: &str, template: &str) -> Self {
        Self {
            uri: uri.to_string(),
            template: template.to_string(),
        }
    }
}

/// User-authored configuration, as read from `critical.config.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CriticalConfig {
    /// Site serving the rendered pages
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Where the `{template}_critical.min.css` files land (relative to the project root)
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Build manifest location, relative to the project root
    #[serde(default = "default_manifest_path")]
    pub manifest_path: String,

    /// Manifest entry whose CSS list holds the stylesheet
    #[serde(default = "default_css_entry")]
    pub css_entry: String,

    /// Directory stylesheet URLs are resolved against
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// URL prefix stripped from stylesheet hrefs before resolving them on disk
    #[serde(default = "default_public_path")]
    pub public_path: String,

    /// Pages to generate critical CSS for
    #[serde(default = "default_pages")]
    pub pages: Vec<PageSpec>,

    /// Options handed to the extraction engine, layered over its defaults
    #[serde(default)]
    pub critical_options: EngineOptions,
}

impl Default for CriticalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            manifest_path: default_manifest_path(),
            css_entry: default_css_entry(),
            public_dir: default_public_dir(),
            public_path: default_public_path(),
            pages: default_pages(),
            critical_options: EngineOptions::default(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_output_dir() -> String {
    "web/dist/criticalcss".to_string()
}

fn default_manifest_path() -> String {
    "web/dist/.vite/manifest.json".to_string()
}

fn default_css_entry() -> String {
    "src/js/app.ts".to_string()
}

fn default_public_dir() -> String {
    "web".to_string()
}

fn default_public_path() -> String {
    "/".to_string()
}

fn default_pages() -> Vec<PageSpec> {
    vec![PageSpec::new("/", "index")]
}

impl CriticalConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| CriticalError::io(path, e))?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Apply the `CRITICAL_BASE_URL` override when it is set and non-empty
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            if !base_url.is_empty() {
                ::log::debug!("Using {} from environment: {}", BASE_URL_ENV, base_url);
                self.base_url = base_url;
            }
        }
        self
    }

    /// Validate the configuration and turn every path into its absolute form
    pub fn resolve(self, project_root: impl AsRef<Path>) -> Result<ResolvedConfig> {
        let project_root = std::path::absolute(project_root.as_ref())
            .map_err(|e| CriticalError::io(project_root.as_ref(), e))?;

        let base_url = normalize_base_url(&self.base_url)?;

        if self.css_entry.trim().is_empty() {
            return Err(CriticalError::Config("css_entry must not be empty".into()));
        }
        if let Some(page) = self.pages.iter().find(|p| p.template.trim().is_empty()) {
            return Err(CriticalError::Config(format!(
                "page {} has an empty template name",
                page.uri
            )));
        }

        let pages = self
            .pages
            .into_iter()
            .map(|page| PageSpec {
                uri: normalize_uri(&page.uri),
                template: page.template,
            })
            .collect();

        Ok(ResolvedConfig {
            base_url,
            output_dir: join_absolute(&project_root, &self.output_dir),
            manifest_path: PathBuf::from(self.manifest_path),
            css_entry: self.css_entry,
            public_dir: join_absolute(&project_root, &self.public_dir),
            public_path: self.public_path,
            project_root,
            pages,
            critical_options: self.critical_options,
        })
    }
}

/// Fully merged configuration consumed by the pipeline
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute base URL without a trailing slash
    pub base_url: String,
    /// Absolute output directory
    pub output_dir: PathBuf,
    /// Manifest path, relative to `project_root`
    pub manifest_path: PathBuf,
    pub css_entry: String,
    pub project_root: PathBuf,
    /// Absolute directory stylesheet hrefs resolve into
    pub public_dir: PathBuf,
    pub public_path: String,
    pub pages: Vec<PageSpec>,
    pub critical_options: EngineOptions,
}

fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| CriticalError::Config(format!("invalid base_url {}: {}", raw, e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(CriticalError::Config(format!(
            "base_url must be http or https, got {}",
            url.scheme()
        )));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn normalize_uri(uri: &str) -> String {
    if uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("/{}", uri)
    }
}

fn join_absolute(root: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

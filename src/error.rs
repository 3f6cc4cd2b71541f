use std::path::PathBuf;

/// Errors raised while generating critical CSS
#[derive(Debug, thiserror::Error)]
pub enum CriticalError {
    /// Neither the manifest nor the assets directory produced a stylesheet
    #[error(
        "No CSS found via manifest {manifest} or in {assets_dir}; run the asset build first"
    )]
    NoCssFound {
        manifest: PathBuf,
        assets_dir: PathBuf,
    },

    /// The output directory could not be created
    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid or incomplete configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Filesystem failure on a specific path
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Network-level HTTP failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} {status_text} for {url}")]
    Status {
        url: String,
        status: u16,
        status_text: String,
    },

    /// JSON parse failure (config files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The engine produced no usable critical CSS for a page
    #[error("No critical CSS extracted")]
    NoCriticalCss,

    /// A stylesheet referenced by the page could not be used
    #[error("Stylesheet {href}: {reason}")]
    Stylesheet { href: String, reason: String },
}

impl CriticalError {
    /// Wrap an I/O error together with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error aborts the whole run rather than a single page
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoCssFound { .. } | Self::OutputDir { .. })
    }
}

pub type Result<T> = std::result::Result<T, CriticalError>;

use crate::error::{CriticalError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Build output directory, relative to the project root
pub const DIST_DIR: &str = "web/dist";

/// Directory scanned when the manifest is of no use
pub const ASSETS_DIR: &str = "web/dist/assets";

/// URL prefix the build output is served under
pub const DIST_HREF: &str = "/dist";

/// The built stylesheet and the URL it is served at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssAssetInfo {
    pub absolute_path: PathBuf,
    pub href: String,
}

impl CssAssetInfo {
    /// Describe a file relative to the dist directory
    fn from_dist_relative(project_root: &Path, relative: &str) -> Self {
        let relative = relative.trim_start_matches('/');
        Self {
            absolute_path: project_root.join(DIST_DIR).join(relative),
            href: format!("{}/{}", DIST_HREF, relative),
        }
    }
}

/// Outcome of consulting the build manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestLookup {
    Found(CssAssetInfo),
    /// Manifest unreadable, malformed, or without a usable entry
    Missing(String),
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    #[serde(default)]
    css: Vec<String>,
}

/// Look up the first CSS file of `entry` in the manifest
pub async fn lookup_manifest(project_root: &Path, manifest_path: &Path, entry: &str) -> ManifestLookup {
    let path = project_root.join(manifest_path);

    let contents = match tokio::fs::read_to_string(&path).await {
        Ok(contents) => contents,
        Err(e) => return ManifestLookup::Missing(format!("cannot read {}: {}", path.display(), e)),
    };

    let manifest: serde_json::Map<String, serde_json::Value> = match serde_json::from_str(&contents) {
        Ok(manifest) => manifest,
        Err(e) => return ManifestLookup::Missing(format!("cannot parse {}: {}", path.display(), e)),
    };

    let Some(value) = manifest.get(entry) else {
        return ManifestLookup::Missing(format!("entry {} not found in {}", entry, path.display()));
    };

    let css = match serde_json::from_value::<ManifestEntry>(value.clone()) {
        Ok(parsed) => parsed.css,
        Err(e) => return ManifestLookup::Missing(format!("entry {} is malformed: {}", entry, e)),
    };

    match css.first() {
        Some(file) if !file.is_empty() => {
            ManifestLookup::Found(CssAssetInfo::from_dist_relative(project_root, file))
        }
        _ => ManifestLookup::Missing(format!("entry {} lists no CSS files", entry)),
    }
}

/// Pick the first `.css` file in the assets directory, in listing order
pub async fn scan_assets_dir(project_root: &Path) -> Option<CssAssetInfo> {
    let dir = project_root.join(ASSETS_DIR);
    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(e) => {
            ::log::debug!("Cannot list {}: {}", dir.display(), e);
            return None;
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
        if is_file && name.ends_with(".css") {
            return Some(CssAssetInfo::from_dist_relative(
                project_root,
                &format!("assets/{}", name),
            ));
        }
    }

    None
}

/// Locate the built stylesheet, falling back to the assets directory
pub async fn locate_css_asset(
    project_root: &Path,
    manifest_path: &Path,
    entry: &str,
) -> Result<CssAssetInfo> {
    match lookup_manifest(project_root, manifest_path, entry).await {
        ManifestLookup::Found(asset) => {
            ::log::info!("Using CSS from manifest: {}", asset.href);
            return Ok(asset);
        }
        ManifestLookup::Missing(reason) => {
            ::log::warn!("Manifest lookup failed ({}), scanning {}", reason, ASSETS_DIR);
        }
    }

    match scan_assets_dir(project_root).await {
        Some(asset) => {
            ::log::info!("Using CSS from assets directory: {}", asset.href);
            Ok(asset)
        }
        None => Err(CriticalError::NoCssFound {
            manifest: project_root.join(manifest_path),
            assets_dir: project_root.join(ASSETS_DIR),
        }),
    }
}

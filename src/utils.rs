use std::path::{Path, PathBuf};

/// Suffix of every generated file
pub const OUTPUT_SUFFIX: &str = "_critical.min.css";

/// Build the URL a page is fetched from
pub fn page_url(base_url: &str, uri: &str) -> String {
    format!("{}{}", base_url, uri)
}

/// File name the critical CSS for a template is written under
pub fn output_filename(template: &str) -> String {
    format!("{}{}", template, OUTPUT_SUFFIX)
}

/// Full output path for a template
pub fn output_path(output_dir: &Path, template: &str) -> PathBuf {
    output_dir.join(output_filename(template))
}

/// Format a byte count as kilobytes with two decimals
pub fn format_size_kb(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}

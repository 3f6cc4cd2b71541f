pub mod extract;
pub mod sanitize;

#[cfg(test)]
mod tests;

pub use extract::extract_critical_css;
pub use sanitize::sanitize;

/// Attribute marking a style block the sanitizer left behind
pub const PLACEHOLDER_ATTR: &str = "data-critical-placeholder";

/// Attribute marking a style block inlined from a stylesheet link
pub const CRITICAL_HREF_ATTR: &str = "data-critical-href";

/// What every pre-existing `<style>` block is replaced with
pub const STYLE_PLACEHOLDER: &str =
    "<style data-critical-placeholder>/* critical-page: stripped */</style>";

/// Escape CSS for embedding in a `<style>` element
pub fn escape_style_text(css: &str) -> String {
    css.replace("</style", "<\\/style")
}

/// Undo [`escape_style_text`]
pub fn unescape_style_text(css: &str) -> String {
    css.replace("<\\/style", "</style")
}

/// The stylesheet link injected for the extraction engine
pub fn stylesheet_link(href: &str) -> String {
    format!(r#"<link rel="stylesheet" href="{}">"#, escape_attr(href))
}

/// Escape a value for use inside a double-quoted attribute
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

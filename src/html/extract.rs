use crate::html::{CRITICAL_HREF_ATTR, PLACEHOLDER_ATTR, unescape_style_text};
use scraper::{Html, Selector};

/// Recover the critical CSS the engine inlined into `html`
///
/// Blocks tagged with the source stylesheet href win; otherwise every style
/// block except sanitizer placeholders is used. The result is trimmed and
/// may be empty.
pub fn extract_critical_css(html: &str) -> String {
    let doc = Html::parse_document(html);

    let marked_selector = Selector::parse(&format!("style[{}]", CRITICAL_HREF_ATTR)).unwrap();
    let marked: Vec<String> = doc
        .select(&marked_selector)
        .map(|e| unescape_style_text(&e.text().collect::<String>()))
        .collect();

    if !marked.is_empty() {
        ::log::debug!("Found {} marked critical style blocks", marked.len());
        return marked.join("\n").trim().to_string();
    }

    let fallback_selector =
        Selector::parse(&format!("style:not([{}])", PLACEHOLDER_ATTR)).unwrap();
    let fallback: Vec<String> = doc
        .select(&fallback_selector)
        .map(|e| unescape_style_text(&e.text().collect::<String>()))
        .collect();

    ::log::debug!(
        "No marked critical style block, falling back to {} unmarked blocks",
        fallback.len()
    );
    fallback.join("\n").trim().to_string()
}

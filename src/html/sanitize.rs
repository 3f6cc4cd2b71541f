use crate::html::{STYLE_PLACEHOLDER, stylesheet_link};
use regex::{NoExpand, Regex};
use std::sync::LazyLock;

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").unwrap());

static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").unwrap());

static REL_STYLESHEET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\brel\s*=\s*(?:"\s*stylesheet\s*"|'\s*stylesheet\s*'|stylesheet(?:[\s/>]|$))"#)
        .unwrap()
});

static HEAD_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</head\s*>").unwrap());

/// Strip existing styles and stylesheet links, then link the built stylesheet
///
/// Style blocks become a placeholder so the output extractor can tell them
/// apart from blocks the engine inlines later.
pub fn sanitize(html: &str, css_href: &str) -> String {
    let styles = STYLE_BLOCK.find_iter(html).count();
    let without_styles = STYLE_BLOCK.replace_all(html, NoExpand(STYLE_PLACEHOLDER));

    let mut links = 0;
    let without_links = LINK_TAG.replace_all(&without_styles, |caps: &regex::Captures| {
        let tag = &caps[0];
        if REL_STYLESHEET.is_match(tag) {
            links += 1;
            String::new()
        } else {
            tag.to_string()
        }
    });

    ::log::debug!(
        "Sanitizer replaced {} style blocks and removed {} stylesheet links",
        styles,
        links
    );

    inject_link(&without_links, css_href)
}

/// Insert the stylesheet link right before the first `</head>`
pub fn inject_link(html: &str, css_href: &str) -> String {
    let link = stylesheet_link(css_href);

    match HEAD_CLOSE.find(html) {
        Some(head_close) => {
            let mut out = String::with_capacity(html.len() + link.len());
            out.push_str(&html[..head_close.start()]);
            out.push_str(&link);
            out.push_str(&html[head_close.start()..]);
            out
        }
        None => {
            ::log::warn!("No </head> in page, prepending stylesheet link");
            format!("{}{}", link, html)
        }
    }
}

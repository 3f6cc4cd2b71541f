pub mod prune;
pub mod stylesheet;

use crate::error::{CriticalError, Result};
use crate::filter::RuleFilter;
use crate::html::{CRITICAL_HREF_ATTR, escape_attr, escape_style_text, stylesheet_link};
use prune::Pruner;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static LINK_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<link\b[^>]*>").unwrap());

/// Inlines the critical subset of a page's stylesheets
pub trait CriticalEngine {
    /// Return `html` with critical rules inlined as `<style>` blocks
    fn process(&self, html: &str) -> impl Future<Output = Result<String>> + Send;
}

/// How the original stylesheet link is rewritten once critical CSS is inlined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreloadStrategy {
    /// `media="print"` swapped to `all` on load
    #[default]
    Media,
    /// `rel="preload"` swapped to `stylesheet` on load
    Swap,
    /// Preload hint plus a script that appends the stylesheet
    Js,
    /// Leave the link as it is
    None,
}

/// Which `@keyframes` blocks survive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyframesStrategy {
    /// Only those referenced by kept rules
    #[default]
    Critical,
    All,
    None,
}

/// Options passed through from user configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct EngineOptions {
    pub preload: PreloadStrategy,

    /// Add a `<noscript>` stylesheet fallback for deferred links
    pub noscript: bool,

    /// Minify the inlined CSS
    pub compress: bool,

    pub keyframes: KeyframesStrategy,

    /// Keep `@font-face` rules
    pub inline_fonts: bool,

    /// Regex patterns for selectors that are always kept
    pub allow_rules: Vec<String>,

    /// Regex patterns for selectors that are always dropped
    pub exclude_rules: Vec<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            preload: PreloadStrategy::Media,
            noscript: true,
            compress: true,
            keyframes: KeyframesStrategy::Critical,
            inline_fonts: false,
            allow_rules: Vec::new(),
            exclude_rules: Vec::new(),
        }
    }
}

/// A stylesheet link found in the page
struct LinkRef {
    start: usize,
    end: usize,
    tag: String,
    href: String,
}

/// Built-in engine resolving stylesheets from disk and pruning them by
/// matching selectors against the page
#[derive(Debug)]
pub struct InlineEngine {
    root: PathBuf,
    public_path: String,
    options: EngineOptions,
    filter: RuleFilter,
}

impl InlineEngine {
    /// Create an engine resolving hrefs under `public_path` into `root`
    pub fn new(root: impl Into<PathBuf>, public_path: &str, options: EngineOptions) -> Result<Self> {
        let filter = RuleFilter::new(&options.allow_rules, &options.exclude_rules)
            .map_err(|e| CriticalError::Config(format!("invalid rule pattern: {}", e)))?;

        Ok(Self {
            root: root.into(),
            public_path: public_path.to_string(),
            options,
            filter,
        })
    }

    /// Map a stylesheet href to a file under the root
    pub fn resolve_href(&self, href: &str) -> Result<PathBuf> {
        let path = href.split(['?', '#']).next().unwrap_or_default();
        let relative = path.strip_prefix(self.public_path.as_str()).unwrap_or(path);
        let relative = Path::new(relative.trim_start_matches('/'));

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(CriticalError::Stylesheet {
                href: href.to_string(),
                reason: "resolves outside the public directory".to_string(),
            });
        }

        Ok(self.root.join(relative))
    }

    /// Compute the critical subset of `css` for an already parsed page
    pub fn critical_css(&self, css: &str, doc: &Html) -> String {
        let nodes = stylesheet::parse(css);
        let (kept, stats) = Pruner::new(doc, &self.filter, &self.options).prune(nodes);
        ::log::debug!(
            "Kept {} selectors, dropped {}",
            stats.kept_selectors,
            stats.dropped_selectors
        );
        stylesheet::serialize(&kept, self.options.compress)
    }

    /// Replacement markup for the original link
    fn deferred_link(&self, tag: &str, href: &str) -> String {
        let escaped = escape_attr(href);
        let deferred = match self.options.preload {
            PreloadStrategy::None => return tag.to_string(),
            PreloadStrategy::Media => format!(
                r#"<link rel="stylesheet" href="{}" media="print" onload="this.media='all'">"#,
                escaped
            ),
            PreloadStrategy::Swap => format!(
                r#"<link rel="preload" href="{}" as="style" onload="this.rel='stylesheet'">"#,
                escaped
            ),
            PreloadStrategy::Js => {
                let literal = serde_json::to_string(href).unwrap_or_default();
                format!(
                    r#"<link rel="preload" href="{}" as="style"><script>(function(){{var l=document.createElement('link');l.rel='stylesheet';l.href={};document.head.appendChild(l)}})()</script>"#,
                    escaped,
                    literal.replace("</", "<\\/")
                )
            }
        };

        if self.options.noscript {
            format!("{}<noscript>{}</noscript>", deferred, stylesheet_link(href))
        } else {
            deferred
        }
    }

    fn render(&self, html: &str, links: &[LinkRef], sheets: &[String]) -> String {
        let doc = Html::parse_document(html);
        let mut out = String::with_capacity(html.len());
        let mut copied = 0;

        for (link, css) in links.iter().zip(sheets) {
            out.push_str(&html[copied..link.start]);

            let critical = self.critical_css(css, &doc);
            if critical.trim().is_empty() {
                ::log::debug!("No critical rules in {}", link.href);
            } else {
                out.push_str(&format!(
                    r#"<style {}="{}">{}</style>"#,
                    CRITICAL_HREF_ATTR,
                    escape_attr(&link.href),
                    escape_style_text(&critical)
                ));
            }

            out.push_str(&self.deferred_link(&link.tag, &link.href));
            copied = link.end;
        }

        out.push_str(&html[copied..]);
        out
    }
}

impl CriticalEngine for InlineEngine {
    async fn process(&self, html: &str) -> Result<String> {
        let links = stylesheet_links(html);

        let mut sheets = Vec::with_capacity(links.len());
        for link in &links {
            let path = self.resolve_href(&link.href)?;
            ::log::debug!("Reading stylesheet {} from {}", link.href, path.display());
            let css = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| CriticalError::Stylesheet {
                    href: link.href.clone(),
                    reason: format!("cannot read {}: {}", path.display(), e),
                })?;
            sheets.push(css);
        }

        Ok(self.render(html, &links, &sheets))
    }
}

/// Local stylesheet links in document order
fn stylesheet_links(html: &str) -> Vec<LinkRef> {
    let selector = Selector::parse(r#"link[rel="stylesheet" i][href]"#).unwrap();

    LINK_TAG
        .find_iter(html)
        .filter_map(|m| {
            let fragment = Html::parse_fragment(m.as_str());
            let href = fragment
                .select(&selector)
                .next()
                .and_then(|e| e.value().attr("href"))?
                .to_string();

            if is_remote(&href) {
                ::log::debug!("Skipping remote stylesheet {}", href);
                return None;
            }

            Some(LinkRef {
                start: m.start(),
                end: m.end(),
                tag: m.as_str().to_string(),
                href,
            })
        })
        .collect()
}

fn is_remote(href: &str) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn engine(root: &Path, options: EngineOptions) -> InlineEngine {
        InlineEngine::new(root, "/", options).unwrap()
    }

    fn site_with_css(css: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("dist/assets")).unwrap();
        fs::write(dir.path().join("dist/assets/app.css"), css).unwrap();
        dir
    }

    const PAGE: &str = r#"<html><head><link rel="stylesheet" href="/dist/assets/app.css"></head><body><h1>Hi</h1></body></html>"#;

    #[test]
    fn test_options_deserialize_camel_case() {
        let options: EngineOptions =
            serde_json::from_str(r#"{ "inlineFonts": true, "keyframes": "none", "allowRules": ["^\\.x"] }"#)
                .unwrap();
        assert!(options.inline_fonts);
        assert_eq!(options.keyframes, KeyframesStrategy::None);
        assert_eq!(options.allow_rules, vec![r"^\.x".to_string()]);
        assert_eq!(options.preload, PreloadStrategy::Media);
    }

    #[test]
    fn test_invalid_rule_pattern() {
        let options = EngineOptions {
            exclude_rules: vec!["[".to_string()],
            ..EngineOptions::default()
        };
        assert!(matches!(
            InlineEngine::new("/tmp", "/", options),
            Err(CriticalError::Config(_))
        ));
    }

    #[test]
    fn test_resolve_href() {
        let engine = InlineEngine::new("/srv/web", "/", EngineOptions::default()).unwrap();
        assert_eq!(
            engine.resolve_href("/dist/assets/app.css?v=2").unwrap(),
            PathBuf::from("/srv/web/dist/assets/app.css")
        );
        assert!(engine.resolve_href("/../secret.css").is_err());

        let prefixed = InlineEngine::new("/srv/web", "/static/", EngineOptions::default()).unwrap();
        assert_eq!(
            prefixed.resolve_href("/static/app.css").unwrap(),
            PathBuf::from("/srv/web/app.css")
        );
    }

    #[tokio::test]
    async fn test_process_inlines_and_defers() {
        let site = site_with_css("h1 { color: blue }\n.unused { color: red }");
        let out = engine(site.path(), EngineOptions::default())
            .process(PAGE)
            .await
            .unwrap();

        assert!(out.contains(r#"<style data-critical-href="/dist/assets/app.css">h1{color:blue}</style>"#));
        assert!(out.contains(r#"media="print" onload="this.media='all'""#));
        assert!(out.contains(r#"<noscript><link rel="stylesheet" href="/dist/assets/app.css"></noscript>"#));
        assert!(!out.contains("unused"));
    }

    #[tokio::test]
    async fn test_preload_strategies() {
        let site = site_with_css("h1{color:blue}");

        let swap = EngineOptions {
            preload: PreloadStrategy::Swap,
            noscript: false,
            ..EngineOptions::default()
        };
        let out = engine(site.path(), swap).process(PAGE).await.unwrap();
        assert!(out.contains(r#"rel="preload""#));
        assert!(!out.contains("<noscript>"));

        let js = EngineOptions {
            preload: PreloadStrategy::Js,
            ..EngineOptions::default()
        };
        let out = engine(site.path(), js).process(PAGE).await.unwrap();
        assert!(out.contains(r#"l.href="/dist/assets/app.css""#));

        let none = EngineOptions {
            preload: PreloadStrategy::None,
            ..EngineOptions::default()
        };
        let out = engine(site.path(), none).process(PAGE).await.unwrap();
        assert!(out.contains(r#"<link rel="stylesheet" href="/dist/assets/app.css"></head>"#));
    }

    #[tokio::test]
    async fn test_no_matching_rules_inlines_nothing() {
        let site = site_with_css(".nothing-here{color:red}");
        let out = engine(site.path(), EngineOptions::default())
            .process(PAGE)
            .await
            .unwrap();
        assert!(!out.contains("<style"));
    }

    #[tokio::test]
    async fn test_missing_stylesheet_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine(dir.path(), EngineOptions::default())
            .process(PAGE)
            .await
            .unwrap_err();
        assert!(matches!(err, CriticalError::Stylesheet { href, .. } if href == "/dist/assets/app.css"));
    }

    #[tokio::test]
    async fn test_remote_stylesheets_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let page = r#"<html><head><link rel="stylesheet" href="https://cdn.example.com/x.css"></head><body></body></html>"#;
        let out = engine(dir.path(), EngineOptions::default())
            .process(page)
            .await
            .unwrap();
        assert_eq!(out, page);
    }

    #[tokio::test]
    async fn test_alternate_stylesheets_are_not_inlined() {
        let site = site_with_css("h1{color:blue}");
        let page = r#"<html><head><link rel="alternate stylesheet" href="/themes/dark.css" title="Dark"><link rel="stylesheet" href="/dist/assets/app.css"></head><body><h1>Hi</h1></body></html>"#;
        let out = engine(site.path(), EngineOptions::default())
            .process(page)
            .await
            .unwrap();

        assert!(out.contains(r#"<link rel="alternate stylesheet" href="/themes/dark.css" title="Dark">"#));
        assert!(out.contains(r#"<style data-critical-href="/dist/assets/app.css">h1{color:blue}</style>"#));
        assert!(!out.contains(r#"data-critical-href="/themes/dark.css""#));
    }

    #[tokio::test]
    async fn test_style_end_tag_in_css_survives_extraction() {
        let site = site_with_css(r#"h1::after{content:"</style><p>x"}"#);
        let out = engine(site.path(), EngineOptions::default())
            .process(PAGE)
            .await
            .unwrap();

        assert!(!out.contains(r#""</style><p>x""#));
        assert_eq!(
            crate::html::extract_critical_css(&out),
            r#"h1::after{content:"</style><p>x"}"#
        );
    }
}

use crate::engine::stylesheet::{CssNode, split_top_level};
use crate::engine::{EngineOptions, KeyframesStrategy};
use crate::filter::RuleFilter;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Pseudo-elements, which never match an element in the document
static PSEUDO_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)::[\w-]+(?:\([^)]*\))?|:(?:before|after|first-line|first-letter)\b").unwrap()
});

/// Interaction states a freshly loaded page is not in
static STATE_PSEUDO_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i):(?:focus-within|focus-visible|focus|hover|active|visited|target|-webkit-autofill|autofill)\b",
    )
    .unwrap()
});

static ANIMATION_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\banimation(?:-name)?\s*:\s*([^;}]+)").unwrap());

/// Counts reported after pruning
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneStats {
    pub kept_selectors: usize,
    pub dropped_selectors: usize,
}

/// Reduces a rule tree to what the document needs
pub struct Pruner<'a> {
    doc: &'a Html,
    filter: &'a RuleFilter,
    options: &'a EngineOptions,
    stats: PruneStats,
}

impl<'a> Pruner<'a> {
    pub fn new(doc: &'a Html, filter: &'a RuleFilter, options: &'a EngineOptions) -> Self {
        Self {
            doc,
            filter,
            options,
            stats: PruneStats::default(),
        }
    }

    /// Prune `nodes`, returning the surviving tree and selector counts
    pub fn prune(mut self, nodes: Vec<CssNode>) -> (Vec<CssNode>, PruneStats) {
        let kept = self.prune_nodes(nodes);

        let kept = match self.options.keyframes {
            KeyframesStrategy::All => kept,
            KeyframesStrategy::None => retain_keyframes(kept, &|_: &str| false),
            KeyframesStrategy::Critical => {
                let names = animation_names(&kept);
                retain_keyframes(kept, &|name: &str| names.contains(name))
            }
        };

        (kept, self.stats)
    }

    fn prune_nodes(&mut self, nodes: Vec<CssNode>) -> Vec<CssNode> {
        let mut kept = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                CssNode::Style {
                    selectors,
                    declarations,
                } => {
                    let total = selectors.len();
                    let selectors: Vec<String> = selectors
                        .into_iter()
                        .filter(|s| self.keep_selector(s))
                        .collect();
                    self.stats.kept_selectors += selectors.len();
                    self.stats.dropped_selectors += total - selectors.len();
                    if !selectors.is_empty() {
                        kept.push(CssNode::Style {
                            selectors,
                            declarations,
                        });
                    }
                }
                CssNode::Group {
                    name,
                    prelude,
                    children,
                } => {
                    let children = self.prune_nodes(children);
                    if !children.is_empty() {
                        kept.push(CssNode::Group {
                            name,
                            prelude,
                            children,
                        });
                    }
                }
                CssNode::AtBlock { ref name, .. } => {
                    let lower = name.to_ascii_lowercase();
                    let keep = match lower.as_str() {
                        "font-face" => self.options.inline_fonts,
                        "page" => false,
                        _ => true,
                    };
                    if keep {
                        kept.push(node);
                    }
                }
                CssNode::AtStatement { ref name, .. } => {
                    let lower = name.to_ascii_lowercase();
                    if lower != "import" && lower != "charset" {
                        kept.push(node);
                    }
                }
            }
        }

        kept
    }

    fn keep_selector(&self, selector: &str) -> bool {
        if let Some(forced) = self.filter.decide(selector) {
            return forced;
        }

        let normalized = normalize_selector(selector);
        match Selector::parse(&normalized) {
            Ok(parsed) => self.doc.select(&parsed).next().is_some(),
            Err(_) => {
                ::log::debug!("Keeping selector scraper cannot parse: {}", selector);
                true
            }
        }
    }
}

/// Strip pseudo-elements and interaction states so the selector can be
/// matched against a static document
pub fn normalize_selector(selector: &str) -> String {
    let stripped = PSEUDO_ELEMENT.replace_all(selector, "");
    let stripped = STATE_PSEUDO_CLASS.replace_all(&stripped, "");
    let mut normalized = stripped.trim().to_string();

    if normalized.is_empty() {
        return "*".to_string();
    }
    if normalized.ends_with(['>', '+', '~']) {
        normalized.push_str(" *");
    }
    normalized
}

/// Animation names referenced by style rules in the tree
fn animation_names(nodes: &[CssNode]) -> HashSet<String> {
    let mut names = HashSet::new();
    collect_animation_names(nodes, &mut names);
    names
}

fn collect_animation_names(nodes: &[CssNode], names: &mut HashSet<String>) {
    for node in nodes {
        match node {
            CssNode::Style { declarations, .. } => {
                for caps in ANIMATION_DECLARATION.captures_iter(declarations) {
                    for animation in split_top_level(&caps[1], b',') {
                        names.extend(animation.split_whitespace().map(|t| t.to_string()));
                    }
                }
            }
            CssNode::Group { children, .. } => collect_animation_names(children, names),
            _ => {}
        }
    }
}

/// Keep `@keyframes` blocks whose name passes `keep`, dropping emptied groups
fn retain_keyframes(nodes: Vec<CssNode>, keep: &dyn Fn(&str) -> bool) -> Vec<CssNode> {
    nodes
        .into_iter()
        .filter_map(|node| match node {
            CssNode::AtBlock { ref name, ref prelude, .. }
                if name.to_ascii_lowercase().ends_with("keyframes") =>
            {
                keep(prelude.trim()).then_some(node)
            }
            CssNode::Group {
                name,
                prelude,
                children,
            } => {
                let children = retain_keyframes(children, keep);
                (!children.is_empty()).then_some(CssNode::Group {
                    name,
                    prelude,
                    children,
                })
            }
            other => Some(other),
        })
        .collect()
}

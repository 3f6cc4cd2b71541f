//! Minimal CSS rule tree: enough structure to prune rules by selector and
//! print the survivors back out.

/// At-rules whose body is a list of rules
const GROUPING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "layer",
    "container",
    "document",
    "-moz-document",
    "scope",
];

/// A node of a parsed stylesheet
#[derive(Debug, Clone, PartialEq)]
pub enum CssNode {
    /// `a, b { ... }`
    Style {
        selectors: Vec<String>,
        declarations: String,
    },
    /// `@media ... { rules }` and other grouping at-rules
    Group {
        name: String,
        prelude: String,
        children: Vec<CssNode>,
    },
    /// `@font-face { ... }`, `@keyframes x { ... }` and other opaque blocks
    AtBlock {
        name: String,
        prelude: String,
        body: String,
    },
    /// `@import ...;`, `@layer a, b;`
    AtStatement { name: String, text: String },
}

/// Parse a stylesheet into a rule tree. Malformed trailing input is ignored.
pub fn parse(css: &str) -> Vec<CssNode> {
    let source = strip_comments(css);
    let mut parser = Parser {
        src: &source,
        pos: 0,
    };
    parser.parse_rules(false)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn bytes(&self) -> &'a [u8] {
        self.src.as_bytes()
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.src.len() && self.bytes()[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn parse_rules(&mut self, nested: bool) -> Vec<CssNode> {
        let src = self.src;
        let mut nodes = Vec::new();

        loop {
            self.skip_whitespace();
            if self.pos >= self.src.len() {
                return nodes;
            }
            if self.bytes()[self.pos] == b'}' {
                self.pos += 1;
                if nested {
                    return nodes;
                }
                // Stray closing brace at the top level
                continue;
            }

            let start = self.pos;
            let Some(end) = self.scan_prelude() else {
                // Unterminated prelude
                self.pos = self.src.len();
                return nodes;
            };
            let prelude = src[start..end].trim();
            let terminator = self.bytes()[end];
            self.pos = end + 1;

            if terminator == b';' {
                if let Some(rest) = prelude.strip_prefix('@') {
                    nodes.push(CssNode::AtStatement {
                        name: at_name(rest),
                        text: format!("{};", prelude),
                    });
                }
                continue;
            }

            if let Some(rest) = prelude.strip_prefix('@') {
                let name = at_name(rest);
                let at_prelude = rest[name.len()..].trim().to_string();
                if GROUPING_AT_RULES.contains(&name.to_ascii_lowercase().as_str()) {
                    let children = self.parse_rules(true);
                    nodes.push(CssNode::Group {
                        name,
                        prelude: at_prelude,
                        children,
                    });
                } else {
                    let body = self.read_block();
                    nodes.push(CssNode::AtBlock {
                        name,
                        prelude: at_prelude,
                        body,
                    });
                }
            } else {
                let body = self.read_block();
                let selectors = split_top_level(prelude, b',');
                if !selectors.is_empty() {
                    nodes.push(CssNode::Style {
                        selectors,
                        declarations: body.trim().to_string(),
                    });
                }
            }
        }
    }

    /// Find the `{` or `;` ending the prelude at the current position
    fn scan_prelude(&self) -> Option<usize> {
        let bytes = self.bytes();
        let mut i = self.pos;
        let mut parens = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' => i = skip_string(bytes, i),
                b'\\' => i += 1,
                b'(' | b'[' => parens += 1,
                b')' | b']' => parens = parens.saturating_sub(1),
                b'{' | b';' if parens == 0 => return Some(i),
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// Read up to the matching `}` (consumed) and return the inner text
    fn read_block(&mut self) -> String {
        let src = self.src;
        let bytes = self.bytes();
        let start = self.pos;
        let mut depth = 1usize;
        let mut i = self.pos;
        while i < bytes.len() {
            match bytes[i] {
                b'"' | b'\'' => i = skip_string(bytes, i),
                b'\\' => i += 1,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos = i + 1;
                        return src[start..i].to_string();
                    }
                }
                _ => {}
            }
            i += 1;
        }
        self.pos = bytes.len();
        src[start..].to_string()
    }
}

fn at_name(rest: &str) -> String {
    rest.chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Index of the closing quote of the string opening at `start`
fn skip_string(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b if b == quote => return i,
            _ => {}
        }
        i += 1;
    }
    bytes.len()
}

/// Remove `/* */` comments outside of strings
pub fn strip_comments(css: &str) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'\\' => i += 1,
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&css[copied..i]);
                let end = css[i + 2..].find("*/").map(|p| i + 2 + p + 2).unwrap_or(bytes.len());
                i = end;
                copied = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    if copied < css.len() {
        out.push_str(&css[copied..]);
    }
    out
}

/// Split on `sep` outside of strings, parentheses and brackets
pub fn split_top_level(text: &str, sep: u8) -> Vec<String> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'\\' => i += 1,
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b if b == sep && depth == 0 => {
                parts.push(text[start..i].trim().to_string());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if start <= text.len() {
        parts.push(text[start.min(text.len())..].trim().to_string());
    }

    parts.retain(|p| !p.is_empty());
    parts
}

/// Print a rule tree, minified when `compress` is set
pub fn serialize(nodes: &[CssNode], compress: bool) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, compress, 0);
    }
    if compress {
        out
    } else {
        out.trim_end().to_string()
    }
}

fn write_node(out: &mut String, node: &CssNode, compress: bool, depth: usize) {
    let indent = "  ".repeat(depth);
    match node {
        CssNode::Style {
            selectors,
            declarations,
        } => {
            if compress {
                let selectors: Vec<String> = selectors.iter().map(|s| minify_selector(s)).collect();
                out.push_str(&selectors.join(","));
                out.push('{');
                out.push_str(&minify_block(declarations));
                out.push('}');
            } else {
                out.push_str(&format!(
                    "{}{} {{ {} }}\n",
                    indent,
                    selectors.join(", "),
                    collapse_whitespace(declarations)
                ));
            }
        }
        CssNode::Group {
            name,
            prelude,
            children,
        } => {
            let head = at_head(name, prelude);
            if compress {
                out.push_str(&head);
                out.push('{');
                for child in children {
                    write_node(out, child, compress, depth + 1);
                }
                out.push('}');
            } else {
                out.push_str(&format!("{}{} {{\n", indent, head));
                for child in children {
                    write_node(out, child, compress, depth + 1);
                }
                out.push_str(&format!("{}}}\n", indent));
            }
        }
        CssNode::AtBlock {
            name,
            prelude,
            body,
        } => {
            let head = at_head(name, prelude);
            if compress {
                out.push_str(&head);
                out.push('{');
                out.push_str(&minify_block(body));
                out.push('}');
            } else {
                out.push_str(&format!(
                    "{}{} {{ {} }}\n",
                    indent,
                    head,
                    collapse_whitespace(body)
                ));
            }
        }
        CssNode::AtStatement { text, .. } => {
            if compress {
                out.push_str(&collapse_whitespace(text));
            } else {
                out.push_str(&format!("{}{}\n", indent, collapse_whitespace(text)));
            }
        }
    }
}

fn at_head(name: &str, prelude: &str) -> String {
    if prelude.is_empty() {
        format!("@{}", name)
    } else {
        format!("@{} {}", name, collapse_whitespace(prelude))
    }
}

/// Collapse whitespace runs outside strings into a single space
pub fn collapse_whitespace(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = skip_string(bytes, i),
            b'\\' => i += 1,
            b if b.is_ascii_whitespace() => {
                out.push_str(&text[copied..i]);
                let mut end = i;
                while end < bytes.len() && bytes[end].is_ascii_whitespace() {
                    end += 1;
                }
                out.push(' ');
                i = end;
                copied = end;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    if copied < text.len() {
        out.push_str(&text[copied.min(text.len())..]);
    }
    out.trim().to_string()
}

/// Drop spaces a selector does not need
fn minify_selector(selector: &str) -> String {
    tighten(&collapse_whitespace(selector), b",>+~")
}

/// Minify a declaration block (or a nested block like a keyframes body)
fn minify_block(block: &str) -> String {
    let tight = tighten(&collapse_whitespace(block), b":;,{}");

    // Drop the `;` before `}` and at the very end
    let mut out = String::with_capacity(tight.len());
    let mut chars = tight.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ';' && matches!(chars.peek(), None | Some('}')) {
            continue;
        }
        out.push(c);
    }
    out
}

/// Remove single spaces adjacent to the given punctuation, outside strings
fn tighten(text: &str, punctuation: &[u8]) -> String {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' || b == b'\'' {
            let end = skip_string(bytes, i).min(bytes.len() - 1);
            out.extend_from_slice(&bytes[i..=end]);
            i = end + 1;
            continue;
        }
        if b == b' ' {
            let prev_is_punct = out.last().is_some_and(|p| punctuation.contains(p));
            let next_is_punct = bytes.get(i + 1).is_some_and(|n| punctuation.contains(n));
            if prev_is_punct || next_is_punct {
                i += 1;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }

    // Only ASCII spaces were removed, so the bytes are still valid UTF-8
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style_rules() {
        let nodes = parse("h1 { color: blue; }\n.a, .b > p { margin: 0 }");
        assert_eq!(
            nodes,
            vec![
                CssNode::Style {
                    selectors: vec!["h1".into()],
                    declarations: "color: blue;".into(),
                },
                CssNode::Style {
                    selectors: vec![".a".into(), ".b > p".into()],
                    declarations: "margin: 0".into(),
                },
            ]
        );
    }

    #[test]
    fn test_parse_at_rules() {
        let css = r#"@charset "utf-8";
@import url("x.css");
@media (min-width: 600px) { h1 { font-size: 2em } .x{a:b} }
@font-face { font-family: "A"; src: url(a.woff2) }
@keyframes fade { from { opacity: 0 } to { opacity: 1 } }"#;
        let nodes = parse(css);
        assert_eq!(nodes.len(), 5);
        assert!(matches!(&nodes[0], CssNode::AtStatement { name, .. } if name == "charset"));
        assert!(matches!(&nodes[1], CssNode::AtStatement { text, .. } if text == r#"@import url("x.css");"#));
        match &nodes[2] {
            CssNode::Group {
                name,
                prelude,
                children,
            } => {
                assert_eq!(name, "media");
                assert_eq!(prelude, "(min-width: 600px)");
                assert_eq!(children.len(), 2);
            }
            other => panic!("expected group, got {:?}", other),
        }
        assert!(matches!(&nodes[3], CssNode::AtBlock { name, .. } if name == "font-face"));
        match &nodes[4] {
            CssNode::AtBlock { name, prelude, body } => {
                assert_eq!(name, "keyframes");
                assert_eq!(prelude, "fade");
                assert!(body.contains("to { opacity: 1 }"));
            }
            other => panic!("expected at-block, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_and_strings() {
        let css = r#"/* header { } */ a::after { content: "}/*{"; } /* trailing"#;
        let nodes = parse(css);
        assert_eq!(
            nodes,
            vec![CssNode::Style {
                selectors: vec!["a::after".into()],
                declarations: r#"content: "}/*{";"#.into(),
            }]
        );
    }

    #[test]
    fn test_selector_list_with_functions() {
        assert_eq!(
            split_top_level(":is(h1, h2) span, a[title=\"x,y\"]", b','),
            vec![":is(h1, h2) span", "a[title=\"x,y\"]"]
        );
    }

    #[test]
    fn test_serialize_compressed() {
        let nodes = parse(
            "h1 {\n  color: blue;\n}\n@media screen and (max-width: 10px) {\n  .a ,  .b > p { margin : 0 ; padding: 0 1px; }\n}",
        );
        assert_eq!(
            serialize(&nodes, true),
            "h1{color:blue}@media screen and (max-width: 10px){.a,.b>p{margin:0;padding:0 1px}}"
        );
    }

    #[test]
    fn test_serialize_keeps_strings() {
        let nodes = parse(r#"q::before { content: " : ; " }"#);
        assert_eq!(serialize(&nodes, true), r#"q::before{content:" : ; "}"#);
    }

    #[test]
    fn test_serialize_readable() {
        let nodes = parse("h1{color:blue}");
        assert_eq!(serialize(&nodes, false), "h1 { color:blue }");
    }

    #[test]
    fn test_stray_top_level_brace_is_skipped() {
        let nodes = parse(".a{color:red}} h1{color:blue}");
        assert_eq!(nodes.len(), 2);
        assert_eq!(serialize(&nodes, true), ".a{color:red}h1{color:blue}");
    }
}

use crate::html::{STYLE_PLACEHOLDER, sanitize, sanitize::inject_link};

#[test]
fn test_strips_styles_and_links() {
    let html = r#"<html><head><style>a{color:red}</style><link rel="stylesheet" href="x.css"></head><body></body></html>"#;
    let result = sanitize(html, "/dist/assets/app.css");

    assert!(!result.contains("a{color:red}"));
    assert!(!result.contains("x.css"));
    assert_eq!(result.matches("<link").count(), 1);
    assert!(result.contains(r#"<link rel="stylesheet" href="/dist/assets/app.css"></head>"#));
}

#[test]
fn test_style_becomes_placeholder() {
    let html = "<head>\n<STYLE type=\"text/css\">\nbody {\n  margin: 0;\n}\n</STYLE>\n<style>p{}</style></head>";
    let result = sanitize(html, "/dist/a.css");

    assert_eq!(result.matches(STYLE_PLACEHOLDER).count(), 2);
    assert!(!result.contains("margin"));
}

#[test]
fn test_keeps_non_stylesheet_links() {
    let html = r#"<head><link rel="icon" href="/favicon.ico"><link rel="preload" href="font.woff2" as="font"><LINK REL='StyleSheet' href='old.css' /><link href="b.css" rel=stylesheet></head>"#;
    let result = sanitize(html, "/dist/a.css");

    assert!(result.contains(r#"<link rel="icon" href="/favicon.ico">"#));
    assert!(result.contains("font.woff2"));
    assert!(!result.contains("old.css"));
    assert!(!result.contains("b.css"));
}

#[test]
fn test_injects_before_first_head_close_only() {
    let html = "<html><head><title>t</title></HEAD><body><template></head></template></body></html>";
    let result = sanitize(html, "/dist/a.css");

    assert_eq!(result.matches("/dist/a.css").count(), 1);
    assert!(result.contains(r#"<title>t</title><link rel="stylesheet" href="/dist/a.css"></HEAD>"#));
}

#[test]
fn test_missing_head_prepends_link() {
    let result = inject_link("<p>bare</p>", "/dist/a.css");
    assert_eq!(result, r#"<link rel="stylesheet" href="/dist/a.css"><p>bare</p>"#);
}

#[test]
fn test_href_with_dollar_is_literal() {
    let html = "<head><style>x</style></head>";
    let result = sanitize(html, "/dist/$1.css");
    assert!(result.contains(r#"href="/dist/$1.css""#));
}

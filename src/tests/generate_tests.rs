use crate::config::CriticalConfig;
use crate::tests::serve_once;
use std::fs;

#[tokio::test]
async fn test_generate_against_live_server() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("web/dist/.vite")).unwrap();
    fs::create_dir_all(root.join("web/dist/assets")).unwrap();
    fs::write(
        root.join("web/dist/.vite/manifest.json"),
        r#"{ "src/js/app.ts": { "css": ["assets/app.css"] } }"#,
    )
    .unwrap();
    fs::write(root.join("web/dist/assets/app.css"), "h1 { color: blue }\n.gone { color: red }").unwrap();

    let base_url = serve_once(
        "200 OK",
        r#"<html><head><style>body{margin:0}</style></head><body><h1>Hi</h1></body></html>"#,
    )
    .await;
    let config = CriticalConfig {
        base_url,
        ..CriticalConfig::default()
    }
    .resolve(root)
    .unwrap();

    let summary = crate::generate(config).await.unwrap();

    assert_eq!(summary.successful, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.is_success());
    let css = fs::read_to_string(root.join("web/dist/criticalcss/index_critical.min.css")).unwrap();
    assert_eq!(css, "h1{color:blue}");
}

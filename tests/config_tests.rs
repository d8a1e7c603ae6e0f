use career_chat::config::{BubbleTheme, ChatRenderConfig, ConfigError, DiagramConfig};
use tempfile::TempDir;

#[test]
fn test_config_defaults() {
    let config = ChatRenderConfig::default();
    assert_eq!(config.markdown.diagram_languages, vec!["mermaid".to_string()]);
    assert!(config.markdown.autolink_www);
    assert!(config.markdown.link_target_blank);
    assert_eq!(config.diagrams.engine(), "auto");
    assert_eq!(config.diagrams.kroki_server, None);
    assert_eq!(config.diagrams.drag_multiplier, 1.5);
    assert_eq!(config.diagrams.zoom_scale, 2.0);
    assert_eq!(config.theme.user, BubbleTheme::user());
    assert_eq!(config.theme.assistant, BubbleTheme::assistant());
}

#[test]
fn test_user_and_assistant_bubbles_differ() {
    assert_ne!(BubbleTheme::user().background, BubbleTheme::assistant().background);
    assert_ne!(BubbleTheme::user().link, BubbleTheme::assistant().link);
}

#[test]
fn test_partial_yaml_fills_defaults() {
    let yaml = r#"
markdown:
  diagram_languages: [mermaid, flowchart]
diagrams:
  engine: kroki
  kroki_server: "https://kroki.internal"
"#;
    let config = ChatRenderConfig::from_yaml(yaml).unwrap();
    assert!(config.markdown.is_diagram_language("FlowChart"));
    assert!(config.markdown.autolink_www);
    assert_eq!(config.diagrams.engine(), "kroki");
    assert_eq!(
        config.diagrams.kroki_server.as_deref(),
        Some("https://kroki.internal")
    );
    assert_eq!(config.diagrams.zoom_scale, 2.0);
    assert_eq!(config.theme.assistant, BubbleTheme::assistant());
}

#[test]
fn test_empty_yaml_is_default() {
    let config = ChatRenderConfig::from_yaml("").unwrap();
    assert_eq!(config.diagrams.drag_multiplier, 1.5);
}

#[test]
fn test_out_of_range_values_clamped() {
    let yaml = "diagrams:\n  drag_multiplier: 50.0\n  zoom_scale: 0.2\n";
    let config = ChatRenderConfig::from_yaml(yaml).unwrap();
    assert_eq!(config.diagrams.drag_multiplier, 10.0);
    assert_eq!(config.diagrams.zoom_scale, 1.0);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = ChatRenderConfig::load(&dir.path().join("absent.yaml")).unwrap();
    assert_eq!(config.diagrams.engine(), "auto");
}

#[test]
fn test_malformed_yaml_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "markdown: [unclosed").unwrap();
    match ChatRenderConfig::load(&path) {
        Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.yaml");

    let mut config = ChatRenderConfig::default();
    config.markdown.autolink_www = false;
    config.diagrams.engine = Some("native".to_string());
    config.diagrams.export_dir = Some(dir.path().join("exports"));
    config.theme.user.link = [1, 2, 3];
    config.save(&path).unwrap();

    let loaded = ChatRenderConfig::load(&path).unwrap();
    assert!(!loaded.markdown.autolink_www);
    assert_eq!(loaded.diagrams.engine(), "native");
    assert_eq!(loaded.diagrams.resolved_export_dir(), dir.path().join("exports"));
    assert_eq!(loaded.theme.user.link, [1, 2, 3]);
}

#[test]
fn test_export_dir_falls_back() {
    let config = DiagramConfig::default();
    assert!(!config.resolved_export_dir().as_os_str().is_empty());
}

#[test]
fn test_default_path_location() {
    if let Some(path) = ChatRenderConfig::default_path() {
        assert!(path.ends_with("career-chat/config.yaml"));
    }
}

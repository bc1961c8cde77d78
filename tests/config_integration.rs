use std::path::PathBuf;
use std::time::Duration;

use mdflex::config::{
    ConfigFlags, clear_config_flags, load_config_flags, parse_flag_tokens, save_config_flags,
};
use mdflex::scheduler::RenderBackend;
use mdflex::theme::Theme;
use mdflex::view::ViewMode;

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mdflexrc");
    let content = r#"
# comment
--read

--theme light

--render-debug-log=render.log
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.read);
    assert_eq!(flags.theme, Some(Theme::Light));
    assert_eq!(flags.render_debug_log, Some(PathBuf::from("render.log")));
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, ConfigFlags::default());
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".mdflexrc");
    let content = "--read\n--theme light\n--zoom 150\n--render-debug-log file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "mdflex".to_string(),
        "--theme".to_string(),
        "dark".to_string(),
        "--inline-render".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.read, "file flags should remain enabled");
    assert!(effective.inline_render, "cli flags should be applied");
    assert_eq!(effective.theme, Some(Theme::Dark), "cli should override theme");
    assert_eq!(effective.zoom, Some(150));
    assert_eq!(
        effective.render_debug_log,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_saved_flags_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config");
    let flags = ConfigFlags {
        no_preview: true,
        theme: Some(Theme::Light),
        debounce_ms: Some(80),
        history_depth: Some(25),
        ..ConfigFlags::default()
    };
    save_config_flags(&path, &flags).unwrap();
    assert_eq!(load_config_flags(&path).unwrap(), flags);

    clear_config_flags(&path).unwrap();
    assert!(!path.exists());
    clear_config_flags(&path).unwrap();
}

#[test]
fn test_flags_become_session_config() {
    let args: Vec<String> = [
        "mdflex",
        "--read",
        "--inline-render",
        "--zoom=500",
        "--debounce-ms",
        "120",
        "--coalesce-ms=0",
    ]
    .iter()
    .map(ToString::to_string)
    .collect();
    let config = parse_flag_tokens(&args).session_config();

    assert_eq!(config.mode, ViewMode::Read);
    assert_eq!(config.backend, RenderBackend::Inline);
    assert_eq!(config.zoom.percent(), 200);
    assert_eq!(config.debounce, Duration::from_millis(120));
    assert_eq!(config.coalesce_window, Duration::ZERO);
    assert!(config.preview_pane);
}

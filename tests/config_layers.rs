//! Configuration layering against real files
//!
//! Tests for:
//! - File layer over built-in defaults, CLI layer over the file
//! - Missing default file vs missing explicit file
//! - Provenance digests and redaction
//! - Startup failure on a broken format template

use std::fs;
use std::path::Path;

use ddtail::config::{ConfigError, ConfigOrigin, FileLayer, Settings, REDACTED};
use ddtail::session::SearchOptions;
use sha2::{Digest, Sha256};
use tempfile::TempDir;

const USER_CONFIG: &str = r#"
[server]
api_key = "abc123"
application_key = "def456"
url = "https://logs.example.test/list"

[query]
limit = 200
text = "service:checkout"

[tail]
max_delay_ms = 10000

[fields]
level = "severity"
classname = ["logger", "logger_name"]

[[format]]
name = "plain"
template = "{{._level}} {{._message_text}}"
"#;

fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("ddtail.toml");
    fs::write(&path, contents).expect("write config");
    path
}

#[test]
fn test_file_layer_over_defaults() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, USER_CONFIG);

    let settings = Settings::load(Some(&path), None).expect("load");

    assert_eq!(settings.server().url, "https://logs.example.test/list");
    assert_eq!(settings.server().timeout_seconds, 30);
    assert_eq!(settings.query().limit, 200);
    assert_eq!(settings.query().range_seconds, 60);
    assert_eq!(settings.tail().max_delay_ms, 10_000);
    assert_eq!(settings.tail().min_delay_ms, 1000);
    assert_eq!(settings.templates().len(), 1);

    let mapping = settings.field_mapping();
    assert_eq!(mapping.candidates("level"), Some(&["severity".to_string()][..]));
    assert_eq!(
        mapping.candidates("classname"),
        Some(&["logger".to_string(), "logger_name".to_string()][..])
    );
    assert_eq!(mapping.candidates("message").map(<[String]>::len), Some(2));
}

#[test]
fn test_cli_layer_wins() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, USER_CONFIG);
    let options = SearchOptions {
        text: Some("status:error".to_string()),
        range: Some(std::time::Duration::from_secs(900)),
        ..Default::default()
    };

    let settings = Settings::load(Some(&path), options.cli_overrides()).unwrap();

    assert_eq!(settings.query().text.as_deref(), Some("status:error"));
    assert_eq!(settings.query().range_seconds, 900);
    assert_eq!(settings.query().limit, 200);

    let origins: Vec<ConfigOrigin> = settings.sources().iter().map(|s| s.origin).collect();
    assert_eq!(origins, vec![ConfigOrigin::Builtin, ConfigOrigin::File, ConfigOrigin::Cli]);
}

#[test]
fn test_digest_matches_file_bytes() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, USER_CONFIG);

    let settings = Settings::load(Some(&path), None).unwrap();

    let expected = hex::encode(Sha256::digest(USER_CONFIG.as_bytes()));
    assert_eq!(settings.digest(), Some(expected.as_str()));
    let file_source = &settings.sources()[1];
    assert_eq!(file_source.path.as_deref(), Some(path.to_string_lossy().as_ref()));
}

#[test]
fn test_missing_files() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = Settings::load(Some(&missing), None).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(ref p) if p == &missing));
    assert_eq!(err.exit_code(), 1);

    let settings = Settings::build(FileLayer::Optional(&missing), None).expect("optional file may be absent");
    assert_eq!(settings.sources().len(), 1);
}

#[test]
fn test_unparsable_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "[server\nurl = ");

    let err = Settings::load(Some(&path), None).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_broken_template_fails_at_startup() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[[format]]
name = "shouty"
template = "{{._message_text | scream}}"
"#,
    );

    let err = Settings::load(Some(&path), None).unwrap_err();
    assert!(matches!(err, ConfigError::Template(_)));
    assert!(err.to_string().contains("shouty"));
}

#[test]
fn test_display_is_redacted() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, USER_CONFIG);
    let settings = Settings::load(Some(&path), None).unwrap();

    let shown = settings.to_display_json();
    assert_eq!(shown["config"]["server"]["api_key"], REDACTED);
    assert_eq!(shown["config"]["server"]["application_key"], REDACTED);
    assert_eq!(shown["sources"][1]["origin"], "file");

    let text = shown.to_string();
    assert!(!text.contains("abc123"));
    assert!(!text.contains("def456"));
    assert!(Path::new(shown["sources"][1]["path"].as_str().unwrap()).ends_with("ddtail.toml"));
}

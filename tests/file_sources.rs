//! Integration tests for file-backed sources, including reload on change.

use layered_config::prelude::*;
use layered_config::sources::BASE_PATH_PROPERTY;
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Deserialize, PartialEq)]
struct DatabaseConfig {
    url: String,
    max_connections: u32,
    replicas: Vec<String>,
}

#[test]
fn test_yaml_then_toml_layering() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("base.yaml"),
        r#"
database:
  url: "postgresql://localhost/mydb"
  max_connections: 10
  replicas:
    - "r1"
    - "r2"
"#,
    )
    .unwrap();
    fs::write(
        temp_dir.path().join("override.toml"),
        "[database]\nmax_connections = 50\n",
    )
    .unwrap();

    let config = ConfigurationManager::new();
    config
        .properties()
        .insert(BASE_PATH_PROPERTY, temp_dir.path().display().to_string())
        .unwrap();
    config
        .add_source(FileSource::new("base.yaml"))
        .unwrap()
        .add_source(FileSource::new("override.toml"))
        .unwrap();

    let database: DatabaseConfig = config.get_section("database").bind().unwrap();
    assert_eq!(
        database,
        DatabaseConfig {
            url: "postgresql://localhost/mydb".to_string(),
            max_connections: 50,
            replicas: vec!["r1".to_string(), "r2".to_string()],
        }
    );
}

#[test]
fn test_base_path_change_rebuilds_file_sources() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    fs::write(first.path().join("appsettings.json"), r#"{"Name": "first"}"#).unwrap();
    fs::write(second.path().join("appsettings.json"), r#"{"Name": "second"}"#).unwrap();

    let config = ConfigurationManager::new();
    config
        .properties()
        .insert(BASE_PATH_PROPERTY, first.path().display().to_string())
        .unwrap();
    config.add_source(FileSource::new("appsettings.json")).unwrap();
    assert_eq!(config.get("name").as_deref(), Some("first"));

    let token = config.reload_token();
    config
        .properties()
        .insert(BASE_PATH_PROPERTY, second.path().display().to_string())
        .unwrap();

    assert!(token.has_changed());
    assert_eq!(config.get("name").as_deref(), Some("second"));
}

#[test]
fn test_optional_and_required_files() {
    let temp_dir = TempDir::new().unwrap();
    let config = ConfigurationManager::new();
    config
        .properties()
        .insert(BASE_PATH_PROPERTY, temp_dir.path().display().to_string())
        .unwrap();

    config
        .add_source(FileSource::new("missing.json").optional(true))
        .unwrap();
    assert!(config.get_children().is_empty());

    let required = config.add_source(FileSource::new("missing.json"));
    assert!(matches!(required, Err(ConfigError::LoadError(_))));
}

#[test]
fn test_as_enumerable_over_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("appsettings.json");
    fs::write(&path, r#"{"Logging": {"Level": "info", "Targets": ["console"]}}"#).unwrap();

    let config = ConfigurationManager::new();
    config.add_source(FileSource::new(&path)).unwrap();

    let mut pairs = config.get_section("Logging").as_enumerable(true);
    pairs.sort();
    let keys: Vec<String> = pairs.iter().map(|(k, _)| k.to_lowercase()).collect();
    assert_eq!(keys, vec!["level", "targets", "targets:0"]);
}

#[cfg(feature = "file-watch")]
#[tokio::test(flavor = "multi_thread")]
async fn test_reload_on_change_notifies_root() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("appsettings.json");
    fs::write(&path, r#"{"Feature": {"Enabled": false}}"#).unwrap();

    let config = ConfigurationManager::new();
    config
        .add_source(
            FileSource::new(&path)
                .reload_on_change(true)
                .with_debounce(Duration::from_millis(50)),
        )
        .unwrap();
    assert_eq!(config.get("feature:enabled").as_deref(), Some("false"));

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let watched = config.clone();
    let _subscription = on_change(
        move || Some(watched.reload_token()),
        move || {
            let _ = tx.send(());
        },
    );

    // Give the watcher time to start
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(&path, r#"{"Feature": {"Enabled": true}}"#).unwrap();

    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no change notification")
        .expect("channel closed");
    assert_eq!(config.get("feature:enabled").as_deref(), Some("true"));
}

#[cfg(feature = "file-watch")]
#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_update_keeps_last_good_values() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("appsettings.json");
    fs::write(&path, r#"{"Port": 8080}"#).unwrap();

    let config = ConfigurationManager::new();
    config
        .add_source(
            FileSource::new(&path)
                .reload_on_change(true)
                .with_debounce(Duration::from_millis(50)),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(&path, "{ broken").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(config.get("port").as_deref(), Some("8080"));
}

#[test]
fn test_reload_on_change_without_runtime_still_loads() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("appsettings.json");
    fs::write(&path, r#"{"Port": 8080}"#).unwrap();

    let config = ConfigurationManager::new();
    config
        .add_source(FileSource::new(&path).reload_on_change(true))
        .unwrap();
    assert_eq!(config.get("port").as_deref(), Some("8080"));
}

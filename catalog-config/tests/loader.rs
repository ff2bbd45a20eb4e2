use std::fs;

use catalog_config::{ConfigLoader, ConfigSource, EnvOverrides, load_from_file};
use catalog_model::Protocol;

const SAMPLE_TOML: &str = r#"
log_filter = "catalog_core=debug"

[database]
url = "postgres://catalog@localhost/catalog"
max_connections = 4

[scanner.coordinator]
worker_count = 2
queue_capacity = 50

[scanner.moves]
move_window_ms = 1000

[[storage_roots]]
name = "media"
protocol = "local"
path = "/srv/media"
exclude_patterns = ["*.part"]

[[storage_roots]]
name = "nas"
protocol = "smb"
host = "nas.lan"
path = "share"
enabled = false
max_depth = 3
"#;

#[test]
fn toml_file_populates_every_section() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.toml");
    fs::write(&path, SAMPLE_TOML)?;

    let config = load_from_file(&path)?;

    assert_eq!(config.database.max_connections, 4);
    assert_eq!(config.scanner.coordinator.worker_count, 2);
    assert_eq!(config.scanner.coordinator.queue_capacity, 50);
    assert_eq!(config.scanner.coordinator.max_concurrent_scans, 4);
    assert_eq!(config.scanner.moves.move_window_ms, 1_000);
    assert_eq!(config.log_filter.as_deref(), Some("catalog_core=debug"));

    assert_eq!(config.storage_roots.len(), 2);
    let media = &config.storage_roots[0];
    assert_eq!(media.protocol, Protocol::Local);
    assert!(media.enabled);
    assert_eq!(media.max_depth, 10);
    assert_eq!(media.exclude_patterns, vec!["*.part".to_string()]);

    let nas = &config.storage_roots[1];
    assert_eq!(nas.protocol, Protocol::Smb);
    assert!(!nas.enabled);
    assert_eq!(nas.max_depth, 3);

    let enabled: Vec<&str> = config.enabled_roots().map(|root| root.name.as_str()).collect();
    assert_eq!(enabled, vec!["media"]);
    Ok(())
}

#[test]
fn explicit_path_beats_environment() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("explicit.toml");
    fs::write(&path, SAMPLE_TOML)?;

    let env = EnvOverrides {
        config_json: Some(r#"{"database": {"max_connections": 7}}"#.into()),
        ..EnvOverrides::default()
    };
    let load = ConfigLoader::new().with_config_path(&path).resolve(&env)?;

    assert_eq!(load.source, ConfigSource::Explicit(path));
    assert_eq!(load.config.database.max_connections, 4);
    Ok(())
}

#[test]
fn inline_json_is_used_when_no_path_is_given() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let env = EnvOverrides {
        config_json: Some(
            r#"{"scanner": {"coordinator": {"max_concurrent_scans": 1}}}"#.into(),
        ),
        ..EnvOverrides::default()
    };
    let load = ConfigLoader::new().with_search_dir(dir.path()).resolve(&env)?;

    assert_eq!(load.source, ConfigSource::EnvInline);
    assert_eq!(load.config.scanner.coordinator.max_concurrent_scans, 1);
    assert_eq!(load.config.scanner.coordinator.worker_count, 4);
    Ok(())
}

#[test]
fn default_file_is_discovered_in_search_dir() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::create_dir(dir.path().join("config"))?;
    let path = dir.path().join("config").join("catalog.json");
    fs::write(&path, r#"{"storage_roots": [{"name": "media", "protocol": "local", "path": "/srv"}]}"#)?;

    let load = ConfigLoader::new()
        .with_search_dir(dir.path())
        .resolve(&EnvOverrides::default())?;

    assert_eq!(load.source, ConfigSource::File(path));
    assert_eq!(load.config.storage_roots.len(), 1);
    Ok(())
}

#[test]
fn defaults_apply_when_nothing_is_configured() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let load = ConfigLoader::new()
        .with_search_dir(dir.path())
        .resolve(&EnvOverrides::default())?;

    assert_eq!(load.source, ConfigSource::Default);
    assert!(load.config.storage_roots.is_empty());
    assert_eq!(load.config.database.url, None);
    assert_eq!(load.config.scanner.coordinator.queue_capacity, 1_000);
    Ok(())
}

#[test]
fn database_url_env_overrides_file() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("catalog.toml");
    fs::write(&path, SAMPLE_TOML)?;

    let env = EnvOverrides {
        database_url: Some("postgres://override@db/catalog".into()),
        ..EnvOverrides::default()
    };
    let load = ConfigLoader::new().with_search_dir(dir.path()).resolve(&env)?;

    assert_eq!(load.source, ConfigSource::File(path));
    assert_eq!(
        load.config.database.url.as_deref(),
        Some("postgres://override@db/catalog")
    );
    Ok(())
}

#[test]
fn invalid_settings_fail_to_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let env = EnvOverrides {
        config_json: Some(r#"{"scanner": {"coordinator": {"worker_count": 0}}}"#.into()),
        ..EnvOverrides::default()
    };
    let err = ConfigLoader::new()
        .with_search_dir(dir.path())
        .resolve(&env)
        .expect_err("zero workers should be rejected");
    assert!(err.to_string().contains("worker_count"));
    Ok(())
}

#[test]
fn missing_explicit_file_is_an_error() {
    let err = ConfigLoader::new()
        .with_config_path("/definitely/not/here/catalog.toml")
        .resolve(&EnvOverrides::default())
        .expect_err("missing file should fail");
    assert!(err.to_string().contains("failed to read"));
}

//! Configuration loading and path resolution
//!
//! Tests touching `CMON_DATABASE` / `CMON_WORKBOOK` are marked `#[serial]` so they do not
//! race each other on the process environment.

use cmon_common::config::{TomlConfig, ENV_DATABASE, ENV_WORKBOOK, DEFAULT_WORKBOOK_FILE};
use cmon_common::Error;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
fn test_missing_config_file_yields_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = TomlConfig::load(Some(&temp_dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_config_file_is_loaded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
database_path = "/srv/cmon/machines.db"
bind_address = "0.0.0.0:8000"

[logging]
level = "debug"

[workbook]
main_sheet = "Matrix"
header_max_scan = 5

[color]
strong_red = 190
"#,
    )
    .unwrap();

    let config = TomlConfig::load(Some(&path)).unwrap();
    assert_eq!(config.database_path, Some(PathBuf::from("/srv/cmon/machines.db")));
    assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0:8000"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.workbook.main_sheet, "Matrix");
    assert_eq!(config.workbook.criteria_sheet, "Criterios");
    assert_eq!(config.workbook.header_max_scan, 5);
    assert_eq!(config.color.strong_red, 190);
    assert_eq!(config.color.red_max_other, 120);
}

#[test]
fn test_malformed_config_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[workbook\nmain_sheet = ").unwrap();

    let result = TomlConfig::load(Some(&path));
    assert!(matches!(result, Err(Error::ConfigParse { .. })), "got {:?}", result);
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[scoring]\nsaturation_matches = -1.0\n").unwrap();

    assert!(matches!(TomlConfig::load(Some(&path)), Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_env_overrides_toml_database_path() {
    env::set_var(ENV_DATABASE, "/from/env.db");
    let config = TomlConfig {
        database_path: Some(PathBuf::from("/from/toml.db")),
        ..Default::default()
    };

    assert_eq!(config.resolve_database_path(None), PathBuf::from("/from/env.db"));
    assert_eq!(
        config.resolve_database_path(Some(Path::new("/from/cli.db"))),
        PathBuf::from("/from/cli.db")
    );

    env::remove_var(ENV_DATABASE);
    assert_eq!(config.resolve_database_path(None), PathBuf::from("/from/toml.db"));
}

#[test]
#[serial]
fn test_workbook_path_falls_back_to_default_file() {
    env::remove_var(ENV_WORKBOOK);
    let config = TomlConfig::default();
    assert_eq!(config.resolve_workbook_path(None), PathBuf::from(DEFAULT_WORKBOOK_FILE));

    env::set_var(ENV_WORKBOOK, "   ");
    assert_eq!(
        config.resolve_workbook_path(None),
        PathBuf::from(DEFAULT_WORKBOOK_FILE),
        "Blank environment values are ignored"
    );
    env::remove_var(ENV_WORKBOOK);
}

#[test]
#[serial]
fn test_default_database_path_is_absolute_or_local_file() {
    env::remove_var(ENV_DATABASE);
    let path = TomlConfig::default().resolve_database_path(None);
    assert!(path.ends_with("machines.db"));
}

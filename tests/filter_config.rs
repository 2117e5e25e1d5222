mod common;

use common::live_hook;
use querystate::{ConfigError, FilterConfig, FilterKey, FilterValue};
use std::fs;
use tempfile::TempDir;

const DASHBOARD_TOML: &str = r#"
exclude_from_active = ["view"]
mutually_exclusive = [["country", "entity"], ["topic", "keywords"]]

[defaults]
topN = 5
view = "map"

[validators.topN]
kind = "range"
min = 1
max = 20

[validators.order]
kind = "one_of"
values = ["asc", "desc"]

[validators.search]
kind = "max_len"
len = 12
"#;

fn write_config(content: &str) -> (TempDir, std::path::PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let path = temp_dir.path().join("filters.toml");
    fs::write(&path, content).expect("Failed to write config");
    (temp_dir, path)
}

#[test]
fn load_from_file_drives_the_hook() {
    let (_dir, path) = write_config(DASHBOARD_TOML);
    let config = FilterConfig::load_from(&path).unwrap();
    let (hook, _) = live_hook("", config);

    assert_eq!(hook.get_number(FilterKey::TopN), Some(5));
    assert_eq!(hook.get_text(FilterKey::View), Some("map".to_string()));

    hook.set(FilterKey::Order, "sideways");
    hook.set(FilterKey::Search, "a very long search term");
    hook.set(FilterKey::TopN, 21);
    assert!(hook.active_keys().is_empty());
    assert_eq!(hook.rejections().len(), 3);

    hook.set(FilterKey::Topic, "religion");
    hook.set(FilterKey::Keywords, "ramadan");
    assert!(!hook.has(FilterKey::Topic));
    assert_eq!(hook.active_keys(), vec![FilterKey::Keywords]);
}

#[test]
fn empty_document_is_an_empty_config() {
    let config = FilterConfig::from_toml_str("").unwrap();
    assert!(config.exclusive_pairs().is_empty());
    assert!(config.default_for(FilterKey::TopN).is_none());
}

#[test]
fn missing_file_is_a_read_error() {
    let dir = TempDir::new().unwrap();
    let err = FilterConfig::load_from(&dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { .. }));
}

#[test]
fn malformed_file_is_a_parse_error_with_path() {
    let (_dir, path) = write_config("defaults = [");
    match FilterConfig::load_from(&path).unwrap_err() {
        ConfigError::ParseError { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("Expected ParseError, got {other:?}"),
    }
}

#[test]
fn default_failing_its_validator_is_rejected() {
    let err = FilterConfig::from_toml_str(
        r#"
[defaults]
topN = 50

[validators.topN]
kind = "range"
min = 1
max = 20
"#,
    )
    .unwrap_err();

    match err {
        ConfigError::ValidationError { message } => assert!(message.contains("topN")),
        other => panic!("Expected ValidationError, got {other:?}"),
    }
}

#[test]
fn default_of_wrong_kind_is_rejected() {
    let err = FilterConfig::from_toml_str("[defaults]\nyear = \"last\"").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
}

#[test]
fn self_exclusive_pair_is_rejected() {
    let err = FilterConfig::from_toml_str("mutually_exclusive = [[\"term\", \"term\"]]").unwrap_err();
    assert!(matches!(err, ConfigError::ValidationError { .. }));
}

#[test]
fn unknown_validator_kind_is_a_parse_error() {
    let err = FilterConfig::from_toml_str("[validators.term]\nkind = \"regex\"").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidToml(_)));
}

#[test]
fn code_built_config_is_not_checked_at_runtime() {
    let config = FilterConfig::new().with_default(FilterKey::Year, "last");
    assert!(config.validate().is_err());

    let (hook, _) = live_hook("", config);
    assert_eq!(hook.get(FilterKey::Year), None);
    hook.set(FilterKey::Year, 2000);
    assert_eq!(hook.get(FilterKey::Year), Some(FilterValue::Number(2000)));
}

use super::*;
use serial_test::serial;
use std::time::Duration;

fn clear_env() {
    for name in [
        "JOLV_CAPACITY",
        "JOLV_PAGE_SIZE",
        "JOLV_REST_DEBOUNCE_MS",
        "JOLV_LOG_FILE",
    ] {
        std::env::remove_var(name);
    }
}

#[test]
fn defaults_are_sane() {
    let config = ViewerConfig::default();
    assert_eq!(config.capacity, 500);
    assert_eq!(config.page_size, 50);
    assert_eq!(config.rest_debounce, Duration::from_millis(250));
    assert!(config.log_file_path.ends_with("jolv/jolv.log"));
}

#[test]
fn resolve_with_no_file_yields_defaults() {
    assert_eq!(resolve(None), ViewerConfig::default());
}

#[test]
fn file_values_beat_defaults() {
    let file = ConfigFile {
        capacity: Some(200),
        rest_debounce_ms: Some(100),
        ..ConfigFile::default()
    };

    let config = resolve(Some(file));
    assert_eq!(config.capacity, 200);
    assert_eq!(config.rest_debounce, Duration::from_millis(100));
    // Untouched fields keep defaults.
    assert_eq!(config.page_size, 50);
}

#[test]
fn explicit_missing_file_is_an_error() {
    let missing = std::env::temp_dir().join("jolv_no_such_config_9482.toml");
    let err = load_config(Some(missing.clone())).unwrap_err();
    assert!(matches!(err, ConfigError::ReadError { path, .. } if path == missing));
}

#[test]
fn invalid_toml_is_a_parse_error() {
    let path = std::env::temp_dir().join("jolv_bad_config_9482.toml");
    std::fs::write(&path, "capacity = [not valid").unwrap();

    let result = load_config(Some(path.clone()));
    let _ = std::fs::remove_file(&path);

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn unknown_keys_are_rejected() {
    let path = std::env::temp_dir().join("jolv_unknown_key_9482.toml");
    std::fs::write(&path, "not_a_real_key = 1").unwrap();

    let result = load_config(Some(path.clone()));
    let _ = std::fs::remove_file(&path);

    assert!(matches!(result, Err(ConfigError::ParseError { .. })));
}

#[test]
fn valid_file_parses() {
    let path = std::env::temp_dir().join("jolv_good_config_9482.toml");
    std::fs::write(&path, "capacity = 1000\npage_size = 25\n").unwrap();

    let loaded = load_config(Some(path.clone())).unwrap().unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(loaded.capacity, Some(1000));
    assert_eq!(loaded.page_size, Some(25));
    assert_eq!(loaded.rest_debounce_ms, None);
}

#[test]
#[serial(jolv_env)]
fn env_overrides_beat_file_values() {
    clear_env();
    std::env::set_var("JOLV_CAPACITY", "64");

    let file = ConfigFile {
        capacity: Some(200),
        ..ConfigFile::default()
    };
    let config = apply_env_overrides(resolve(Some(file)));

    clear_env();
    assert_eq!(config.capacity, 64);
}

#[test]
#[serial(jolv_env)]
fn unparseable_env_value_is_ignored() {
    clear_env();
    std::env::set_var("JOLV_CAPACITY", "lots");

    let config = apply_env_overrides(ViewerConfig::default());

    clear_env();
    assert_eq!(config.capacity, 500);
}

#[test]
#[serial(jolv_env)]
fn log_file_env_override_applies() {
    clear_env();
    std::env::set_var("JOLV_LOG_FILE", "/tmp/jolv-test.log");

    let config = apply_env_overrides(ViewerConfig::default());

    clear_env();
    assert_eq!(config.log_file_path, PathBuf::from("/tmp/jolv-test.log"));
}

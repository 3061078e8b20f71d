use std::time::Duration;

use assert_matches::assert_matches;

use bank_fd_rates::config::{Config, ConfigLoader, DEFAULT_API_BASE_URL, Timings};
use bank_fd_rates::error::FdError;

#[test]
fn parse_config_overrides() {
    let config: Config = serde_json::from_str(
        r#"{
            "api_base_url": "http://rates.local:5000/api",
            "pacing_ms": 250,
            "notification_ttl_ms": 8000,
            "export_dir": "/tmp/fd-exports"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve_config(config).unwrap();
    assert_eq!(resolved.api_base_url, "http://rates.local:5000/api");
    assert_eq!(resolved.timings.pacing, Duration::from_millis(250));
    assert_eq!(resolved.timings.settle, Timings::default().settle);
    assert_eq!(resolved.timings.notification_ttl, Duration::from_secs(8));
    assert_eq!(resolved.export_dir.as_str(), "/tmp/fd-exports");
}

#[test]
fn default_timings_match_dashboard_behaviour() {
    let timings = Timings::default();
    assert_eq!(timings.pacing, Duration::from_millis(500));
    assert_eq!(timings.settle, Duration::from_secs(1));
    assert_eq!(timings.notification_ttl, Duration::from_secs(5));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("missing.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, FdError::ConfigRead(_));
}

#[test]
fn config_file_is_loaded() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("fdrates.json");
    std::fs::write(&path, r#"{"settle_ms": 2000}"#).unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.api_base_url, DEFAULT_API_BASE_URL);
    assert_eq!(resolved.timings.settle, Duration::from_secs(2));
}

#[test]
fn malformed_config_and_url_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("fdrates.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert_matches!(
        ConfigLoader::resolve(path.to_str()),
        Err(FdError::ConfigParse(_))
    );

    let config = Config {
        api_base_url: Some("localhost without scheme".to_string()),
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config),
        Err(FdError::ConfigParse(_))
    );
}

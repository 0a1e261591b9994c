use super::*;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.data_dir.is_none());
    let sync = config.get_sync();
    assert_eq!(sync.min_reconcile_interval_ms, DEFAULT_MIN_RECONCILE_INTERVAL_MS);
    assert_eq!(sync.verification_interaction_timeout(), Duration::from_millis(500));
    assert_eq!(sync.verification_settle(), Duration::from_millis(1500));
}

#[test]
fn test_cache_defaults() {
    let caches = Config::default().get_caches();
    assert_eq!(caches.link_metadata_capacity, DEFAULT_LINK_METADATA_CAPACITY);
    assert_eq!(caches.dismissed_capacity, DEFAULT_DISMISSED_CAPACITY);
    assert_eq!(
        caches.link_metadata_ttl(),
        Duration::from_secs(DEFAULT_LINK_METADATA_TTL_HOURS * 3600)
    );
}

#[test]
fn test_partial_sync_block_fills_defaults() {
    let json = r#"{"sync": {"minReconcileIntervalMs": 1000}}"#;
    let config: Config = serde_json::from_str(json).unwrap();
    let sync = config.get_sync();
    assert_eq!(sync.min_reconcile_interval_ms, 1000);
    assert_eq!(sync.verification_settle_ms, DEFAULT_VERIFICATION_SETTLE_MS);
    assert_eq!(
        sync.recently_created_window_ms,
        DEFAULT_RECENTLY_CREATED_WINDOW_MS
    );
}

#[test]
fn test_data_dir_expands_tilde() {
    let config = Config {
        data_dir: Some("~/shortcuts-test".to_string()),
        ..Default::default()
    };
    let dir = config.get_data_dir();
    assert!(!dir.to_string_lossy().starts_with('~'));
    assert!(dir.ends_with("shortcuts-test"));
}

#[test]
fn test_config_serialization_skips_unset() {
    let json = serde_json::to_string(&Config::default()).unwrap();
    assert_eq!(json, "{}");
}

#[test]
fn test_load_config_from_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("nope.json"));
    assert!(config.sync.is_none());
}

#[test]
fn test_load_config_from_invalid_json_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();
    let config = load_config_from(&path);
    assert!(config.sync.is_none());
}

#[test]
fn test_load_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"dataDir": "/tmp/sk", "caches": {"dismissedCapacity": 3}}"#,
    )
    .unwrap();
    let config = load_config_from(&path);
    assert_eq!(config.get_data_dir(), std::path::PathBuf::from("/tmp/sk"));
    assert_eq!(config.get_caches().dismissed_capacity, 3);
}

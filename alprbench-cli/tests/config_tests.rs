#![allow(missing_docs)]
use alprbench_cli::config::{ConfigManager, Settings};
use std::fs;
use std::time::Duration;

#[test]
fn missing_user_file_yields_defaults() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("alprbench").join("settings.toml");

    let manager = ConfigManager::load_with_path(&path).expect("load defaults");

    assert_eq!(manager.settings(), &Settings::default());
    assert_eq!(manager.path(), path.as_path());
    assert_eq!(manager.settings().harness.poll_interval_ms, 100);
    assert_eq!(manager.settings().synthetic.frames_per_video, 300);
}

#[test]
fn partial_user_file_overrides_only_named_keys() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("settings.toml");
    fs::write(
        &path,
        "[harness]\npoll_interval_ms = 25\n\n[synthetic]\nbatch_support = true\n",
    )
    .expect("write settings");

    let manager = ConfigManager::load(Some(&path)).expect("load settings");
    let settings = manager.settings();

    assert_eq!(settings.harness.poll_interval_ms, 25);
    assert_eq!(settings.harness.queue_capacity, 10);
    assert_eq!(settings.harness.metadata_timeout(), Duration::from_millis(1000));
    assert!(settings.synthetic.batch_support);
    assert_eq!(settings.synthetic.plates_per_group, 15);
    assert!(settings.assets.endpoint.ends_with("/releases/download/v1"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let missing = temp_dir.path().join("nope.toml");
    assert!(ConfigManager::load(Some(&missing)).is_err());
}

#[test]
fn malformed_file_reports_its_path() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("settings.toml");
    fs::write(&path, "[harness]\npoll_interval_ms = \"fast\"\n").expect("write settings");

    let err = ConfigManager::load_with_path(&path)
        .err()
        .expect("type mismatch must fail");
    assert!(format!("{err:#}").contains("settings.toml"));
}

#[test]
fn custom_cache_dir_is_used() {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let path = temp_dir.path().join("settings.toml");
    let cache = temp_dir.path().join("videos");
    fs::write(
        &path,
        format!("[assets]\ncache_dir = {:?}\n", cache.display().to_string()),
    )
    .expect("write settings");

    let manager = ConfigManager::load_with_path(&path).expect("load settings");
    assert_eq!(manager.settings().assets.cache_dir(), cache);
}

#![allow(clippy::unwrap_used)]
// File-backed state store and config file loading.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use enbp_config::{ConfigError, FileStateStore, load_config_from};
use enbp_core::{MemorySecretStore, Site, SiteRepository, StateStore};

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");

    let store = FileStateStore::open(&path).unwrap();
    assert_eq!(store.get("missing").unwrap(), None);
    store.set("a", json!({ "x": 1 })).unwrap();
    store.set("b", json!(["one", "two"])).unwrap();
    store.delete("b").unwrap();
    store.delete("never-set").unwrap();

    let reopened = FileStateStore::open(&path).unwrap();
    assert_eq!(reopened.get("a").unwrap(), Some(json!({ "x": 1 })));
    assert_eq!(reopened.get("b").unwrap(), None);

    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(leftovers, vec!["state.json".to_owned()]);
}

#[test]
fn test_two_handles_on_one_file_keep_each_others_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let first = FileStateStore::open(&path).unwrap();
    let second = FileStateStore::open(&path).unwrap();
    second.set("a", json!(1)).unwrap();
    assert_eq!(first.get("a").unwrap(), Some(json!(1)));
    first.set("b", json!(2)).unwrap();
    second.delete("missing").unwrap();

    let reopened = FileStateStore::open(&path).unwrap();
    assert_eq!(reopened.get("a").unwrap(), Some(json!(1)));
    assert_eq!(reopened.get("b").unwrap(), Some(json!(2)));

    first.delete("a").unwrap();
    assert_eq!(second.get("a").unwrap(), None);
    assert_eq!(second.get("b").unwrap(), Some(json!(2)));
}

#[test]
fn test_corrupt_state_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = FileStateStore::open(&path).unwrap_err();
    assert!(matches!(err, ConfigError::CorruptState { .. }));
}

#[test]
fn test_sites_persist_as_json_strings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let state = Arc::new(FileStateStore::open(&path).unwrap());
    let repo = SiteRepository::new(state, Arc::new(MemorySecretStore::default()));
    repo.add(Site::gateway("g1", "Lab", "http://gw.local", true))
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let entries = raw["Enapter.Storage.Sites.Connections"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    let site: serde_json::Value = serde_json::from_str(entries[0].as_str().unwrap()).unwrap();
    assert_eq!(
        site,
        json!({
            "id": "g1",
            "type": "gateway",
            "name": "Lab",
            "address": "http://gw.local/api",
            "isActive": true
        })
    );
}

#[test]
fn test_config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "cloud_url = \"https://api.staging.example\"\npoll_interval_secs = 5\ninsecure = false\n",
    )
    .unwrap();

    let config = load_config_from(&path).unwrap();
    assert_eq!(config.cloud_url, "https://api.staging.example");
    assert_eq!(config.poll_interval_secs, 5);
    assert!(!config.insecure);
    assert_eq!(config.timeout_secs, 30);
    assert_eq!(config.output, "table");
}

#[test]
fn test_missing_config_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.cloud_url, "https://api.enapter.com");
    assert!(config.insecure);
}

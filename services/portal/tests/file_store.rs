//! The JSON file store persists the whole ledger and reads it back.

use apex_access_core::{AccessLedger, AccessRegistry, AccessRepository, AccessType, RequestStatus};
use portal_lib::adapters::JsonFileStore;
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test]
async fn missing_file_loads_as_empty_ledger() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path().join("absent.json"));
    assert_eq!(store.load().await.unwrap(), AccessLedger::default());
}

#[tokio::test]
async fn registry_state_survives_a_new_store_instance() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("apex_store.json");

    let registry = AccessRegistry::new(Arc::new(JsonFileStore::new(path.clone())));
    registry.submit_request("a@x.com", "A").await.unwrap();
    registry
        .approve_user("A@X.com", "A", AccessType::Student, "pw1")
        .await
        .unwrap();

    let reopened = AccessRegistry::new(Arc::new(JsonFileStore::new(path.clone())));
    assert!(reopened.is_approved("a@x.com").await.unwrap());
    assert_eq!(
        reopened.view_requests().await.unwrap()[0].status,
        RequestStatus::Approved
    );

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["apex_access_requests"].as_array().map(Vec::len), Some(1));
    assert_eq!(raw["apex_approved_users"][0]["accessType"], "student");
    assert!(!path.with_file_name("apex_store.json.tmp").exists());
}

#[tokio::test]
async fn corrupt_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("apex_store.json");
    std::fs::write(&path, "{not json").unwrap();

    let store = JsonFileStore::new(path);
    assert!(store.load().await.is_err());
}

use std::collections::HashMap;
use std::time::Duration;

use lede_client::JsonFileStore;
use lede_core::{DocumentId, ExtractionResult, KeyValueStore, ResultCache};
use serde_json::json;

fn keys(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|k| k.to_string()).collect()
}

#[tokio::test]
async fn missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("cache.json"));

    assert!(store.get(&keys(&["a"])).await.unwrap().is_empty());
    assert!(store.entries().await.unwrap().is_empty());
}

#[tokio::test]
async fn entries_survive_a_new_store_instance() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.json");

    JsonFileStore::new(&path)
        .set(HashMap::from([("a".to_string(), json!({"n": 1}))]))
        .await
        .unwrap();

    let reopened = JsonFileStore::new(&path);
    let found = reopened.get(&keys(&["a", "b"])).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found["a"], json!({"n": 1}));
}

#[tokio::test]
async fn remove_deletes_only_named_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("cache.json"));
    store
        .set(HashMap::from([
            ("a".to_string(), json!(1)),
            ("b".to_string(), json!(2)),
        ]))
        .await
        .unwrap();

    store.remove(&keys(&["a", "missing"])).await.unwrap();

    let entries = store.entries().await.unwrap();
    assert_eq!(entries.keys().collect::<Vec<_>>(), ["b"]);
}

#[tokio::test]
async fn clear_deletes_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let store = JsonFileStore::new(&path);
    store
        .set(HashMap::from([("a".to_string(), json!(1))]))
        .await
        .unwrap();

    assert_eq!(store.clear().await.unwrap(), 1);
    assert!(!path.exists());
    assert_eq!(store.clear().await.unwrap(), 0);
}

#[tokio::test]
async fn malformed_file_fails_reads_and_is_replaced_on_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    std::fs::write(&path, "[not json").unwrap();
    let store = JsonFileStore::new(&path);

    assert!(store.get(&keys(&["a"])).await.is_err());

    store
        .set(HashMap::from([("a".to_string(), json!(1))]))
        .await
        .unwrap();
    assert_eq!(store.get(&keys(&["a"])).await.unwrap()["a"], json!(1));
}

#[tokio::test]
async fn concurrent_writers_keep_every_entry() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("cache.json"));

    let writes = (0..16).map(|i| {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .set(HashMap::from([(format!("k{i}"), json!(i))]))
                .await
                .unwrap();
        })
    });
    for handle in writes.collect::<Vec<_>>() {
        handle.await.unwrap();
    }

    assert_eq!(store.entries().await.unwrap().len(), 16);
}

#[tokio::test]
async fn result_cache_round_trips_through_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache.json");
    let id = DocumentId::new("Alan_Turing").unwrap();
    let result = ExtractionResult {
        title: "Alan Turing".into(),
        summary: "Alan Turing was an English mathematician and computer scientist.".into(),
    };

    ResultCache::new(JsonFileStore::new(&path), Duration::from_secs(3600))
        .put(&id, &result)
        .await;

    let cache = ResultCache::new(JsonFileStore::new(&path), Duration::from_secs(3600));
    assert_eq!(cache.get(&id).await.unwrap().result, result);

    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["cache_Alan_Turing"]["data"]["title"], "Alan Turing");
    assert!(raw["cache_Alan_Turing"]["ts"].is_i64());
}

use super::*;

#[tokio::test]
async fn stores_and_overwrites_values() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.put(THEME_KEY, "light").await.expect("put");
    storage.put(THEME_KEY, "dark").await.expect("overwrite");
    assert_eq!(
        storage.get(THEME_KEY).await.expect("get").as_deref(),
        Some("dark")
    );
    assert_eq!(storage.keys().await.expect("keys"), vec![THEME_KEY.to_string()]);
}

#[tokio::test]
async fn missing_keys_read_as_none() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(storage.get(TOKEN_KEY).await.expect("get").is_none());
    storage.remove(TOKEN_KEY).await.expect("removing a missing key is fine");
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn json_helpers_round_trip_through_memory_store() {
    let store = MemoryStore::new();
    save_json(&store, USER_KEY, &vec!["a", "b"]).await.expect("save");
    let loaded: Option<Vec<String>> = load_json(&store, USER_KEY).await.expect("load");
    assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));

    store.put(USER_KEY, "{not json").await.expect("put");
    assert!(load_json::<Vec<String>>(&store, USER_KEY).await.is_err());
}

#[test]
fn memory_urls_have_no_file_path() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/series.db?mode=rwc"),
        Some(PathBuf::from("./data/series.db"))
    );
    assert!(sqlite_path("postgres://localhost/db").is_none());
}

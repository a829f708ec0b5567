//! Integration tests for the durable pool file
//!
//! Exercises the registry against a real file on disk across restarts.

use rrproxy::adapters::outbound::FilePoolStore;
use rrproxy::{Backend, Pool, PortRange, Registry};
use std::sync::Arc;
use tempfile::TempDir;

fn range() -> PortRange {
    PortRange::new(9000, 9009).unwrap()
}

async fn open(dir: &TempDir) -> Registry {
    let store = Arc::new(FilePoolStore::new(dir.path().join("pool.json")));
    Registry::open(store, range()).await.unwrap()
}

fn read_json(dir: &TempDir) -> serde_json::Value {
    let bytes = std::fs::read(dir.path().join("pool.json")).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// First start creates the file with the configured bounds
#[tokio::test]
async fn test_first_start_creates_pool_file() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir).await;

    let json = read_json(&dir);
    assert_eq!(json["is_alive"], false);
    assert_eq!(json["port_lower_limit"], 9000);
    assert_eq!(json["port_upper_limit"], 9009);
    assert_eq!(json["backends"], serde_json::json!([]));

    assert_eq!(registry.get_pool().await.unwrap(), Pool::new(range()));
}

/// Backends survive a restart, the running flag does not
#[tokio::test]
async fn test_restart_keeps_backends_and_resets_running() {
    let dir = TempDir::new().unwrap();
    {
        let registry = open(&dir).await;
        registry.set_running(true).await.unwrap();
        registry
            .add_backend(Backend::on_port("http://a", 9000))
            .await
            .unwrap();
        let mut dead = Backend::on_port("http://b", 9001);
        dead.alive = false;
        registry.add_backend(dead).await.unwrap();
        assert_eq!(read_json(&dir)["is_alive"], true);
    }

    let registry = open(&dir).await;
    let pool = registry.get_pool().await.unwrap();

    assert!(!pool.running);
    assert_eq!(read_json(&dir)["is_alive"], false);
    assert_eq!(pool.backends.len(), 2);
    assert_eq!(pool.backends[0], Backend::new("http://a:9000", 9000));
    assert!(!pool.backends[1].alive);
}

/// Stored bounds are kept even if a different range is configured
#[tokio::test]
async fn test_stored_bounds_win_over_configured_range() {
    let dir = TempDir::new().unwrap();
    drop(open(&dir).await);

    let store = Arc::new(FilePoolStore::new(dir.path().join("pool.json")));
    let registry = Registry::open(store, PortRange::new(7000, 7001).unwrap())
        .await
        .unwrap();

    assert_eq!(registry.get_pool().await.unwrap().range(), Some(range()));
}

/// Edits made to the file by another process are picked up on read
#[tokio::test]
async fn test_external_edit_is_observed() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir).await;

    let edited = serde_json::json!({
        "is_alive": true,
        "port_lower_limit": 9000,
        "port_upper_limit": 9009,
        "backends": [{"url": "http://x:9005", "port": 9005, "is_alive": true}]
    });
    std::fs::write(
        dir.path().join("pool.json"),
        serde_json::to_vec(&edited).unwrap(),
    )
    .unwrap();

    let pool = registry.get_pool().await.unwrap();
    assert!(pool.running);
    assert_eq!(pool.backends, vec![Backend::new("http://x:9005", 9005)]);
}

/// A corrupt file is reported, never silently replaced
#[tokio::test]
async fn test_corrupt_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("pool.json"), b"{\"is_alive\": tru").unwrap();

    let store = Arc::new(FilePoolStore::new(dir.path().join("pool.json")));
    assert!(Registry::open(store, range()).await.is_err());
    assert_eq!(
        std::fs::read(dir.path().join("pool.json")).unwrap(),
        b"{\"is_alive\": tru"
    );
}

/// Only the pool file remains after a series of writes
#[tokio::test]
async fn test_writes_leave_no_temp_files() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir).await;

    for port in 9000..9005 {
        registry
            .add_backend(Backend::on_port("http://h", port))
            .await
            .unwrap();
    }
    registry.set_alive(9002, "http://h:9002", false).await.unwrap();

    let names: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(names, vec!["pool.json".to_string()]);
    assert_eq!(read_json(&dir)["backends"].as_array().unwrap().len(), 5);
}

/// set_pool replaces the whole document
#[tokio::test]
async fn test_set_pool_round_trips_through_file() {
    let dir = TempDir::new().unwrap();
    let registry = open(&dir).await;

    let mut pool = Pool::new(range());
    pool.running = true;
    pool.backends.push(Backend::on_port("http://h", 9003));
    registry.set_pool(pool.clone()).await.unwrap();

    drop(registry);
    let store = Arc::new(FilePoolStore::new(dir.path().join("pool.json")));
    let bytes = rrproxy::PoolStore::load(store.as_ref()).await.unwrap().unwrap();
    assert_eq!(rrproxy::codec::decode(&bytes).unwrap(), pool);
}

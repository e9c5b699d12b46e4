//! Integration tests for the filesystem blob store.
//!
//! These run against a temp directory and need no database.

use folio_db::{BlobStore, Error, FilesystemStore};

#[tokio::test]
async fn test_put_returns_public_url() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FilesystemStore::new(dir.path(), "https://notes.example.com");

    let url = store
        .put("user-1/images/1724371200000-abc123.png", b"png-bytes")
        .await
        .expect("put");
    assert_eq!(
        url,
        "https://notes.example.com/files/user-1/images/1724371200000-abc123.png"
    );
}

#[tokio::test]
async fn test_round_trip_and_delete() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FilesystemStore::new(dir.path(), "http://localhost:3000");
    let key = "user-1/images/1-aaaaaa.jpg";

    store.put(key, b"hello blob").await.expect("put");
    assert!(store.exists(key).await.expect("exists"));
    assert_eq!(store.get(key).await.expect("get"), b"hello blob");

    store.delete(key).await.expect("delete");
    assert!(!store.exists(key).await.expect("exists"));

    // Deleting again is not an error.
    store.delete(key).await.expect("second delete");

    match store.get(key).await {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other.map(|b| b.len())),
    }
}

#[tokio::test]
async fn test_overwrite_is_atomic_replacement() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FilesystemStore::new(dir.path(), "http://localhost:3000");
    let key = "user-1/images/2-bbbbbb.png";

    store.put(key, b"first").await.expect("put");
    store.put(key, b"second").await.expect("overwrite");
    assert_eq!(store.get(key).await.expect("get"), b"second");
}

#[tokio::test]
async fn test_traversal_keys_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FilesystemStore::new(dir.path(), "http://localhost:3000");

    for key in ["../escape", "a/../../b", "/rooted", "a//b"] {
        match store.put(key, b"x").await {
            Err(Error::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput for {:?}, got {:?}", key, other),
        }
        match store.get(key).await {
            Err(Error::InvalidInput(_)) => {}
            other => panic!(
                "expected InvalidInput for {:?}, got {:?}",
                key,
                other.map(|b| b.len())
            ),
        }
    }
}

#[tokio::test]
async fn test_validate_round_trips_probe() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FilesystemStore::new(dir.path(), "http://localhost:3000");
    store.validate().await.expect("validate");
}

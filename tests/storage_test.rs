use std::fs;

use spotlake::error::StorageError;
use spotlake::storage::{Location, LocalStorage, Storage, StorageRoot};
use tempfile::TempDir;

fn storage() -> (TempDir, LocalStorage) {
    let dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::new(dir.path().join("lake"));
    (dir, storage)
}

#[tokio::test]
async fn test_greeting_end_to_end() {
    let (_dir, storage) = storage();

    storage.save("greeting.txt", b"hello").await.unwrap();
    assert!(storage.exists("greeting.txt").await.unwrap());
    assert_eq!(storage.load("greeting.txt").await.unwrap(), b"hello");

    storage.delete("greeting.txt").await.unwrap();
    assert!(!storage.exists("greeting.txt").await.unwrap());
}

#[tokio::test]
async fn test_save_creates_intermediate_directories() {
    let (_dir, storage) = storage();

    storage
        .save("raw/playlists/p1/tracks.json", b"{}")
        .await
        .unwrap();

    let on_disk = storage.base().join("raw/playlists/p1/tracks.json");
    assert_eq!(fs::read(on_disk).unwrap(), b"{}");
    assert!(storage.exists("raw/playlists").await.unwrap());
}

#[tokio::test]
async fn test_save_overwrites_existing_content() {
    let (_dir, storage) = storage();

    storage.save("a.bin", b"first version").await.unwrap();
    storage.save("a.bin", b"2nd").await.unwrap();

    assert_eq!(storage.load("a.bin").await.unwrap(), b"2nd");
}

#[tokio::test]
async fn test_round_trip_preserves_arbitrary_bytes() {
    let (_dir, storage) = storage();
    let data: Vec<u8> = (0..=255u8).chain([0, 0, 255]).collect();

    storage.save("binary/all-bytes", &data).await.unwrap();
    assert_eq!(storage.load("binary/all-bytes").await.unwrap(), data);

    storage.save("empty", b"").await.unwrap();
    assert_eq!(storage.load("empty").await.unwrap(), Vec::<u8>::new());
}

#[tokio::test]
async fn test_load_missing_is_not_found() {
    let (_dir, storage) = storage();

    assert!(!storage.exists("missing.json").await.unwrap());
    let err = storage.load("missing.json").await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_exists_reports_directories() {
    let (_dir, storage) = storage();
    storage.save("raw/a.txt", b"a").await.unwrap();

    assert!(storage.exists("raw").await.unwrap());
    assert!(storage.exists("raw/a.txt").await.unwrap());
    assert!(!storage.exists("processed").await.unwrap());
}

#[tokio::test]
async fn test_delete_missing_is_a_noop() {
    let (_dir, storage) = storage();

    storage.delete("never/written").await.unwrap();
    storage.delete("never/written").await.unwrap();
    assert!(!storage.exists("never/written").await.unwrap());
}

#[tokio::test]
async fn test_delete_twice_equals_once() {
    let (_dir, storage) = storage();
    storage.save("keep.txt", b"k").await.unwrap();
    storage.save("gone.txt", b"g").await.unwrap();

    storage.delete("gone.txt").await.unwrap();
    storage.delete("gone.txt").await.unwrap();

    assert!(!storage.exists("gone.txt").await.unwrap());
    assert!(storage.exists("keep.txt").await.unwrap());
}

#[tokio::test]
async fn test_delete_directory_with_files() {
    let (_dir, storage) = storage();
    storage.save("dir/a.txt", b"a").await.unwrap();
    storage.save("dir/b.txt", b"b").await.unwrap();

    storage.delete("dir").await.unwrap();

    assert!(!storage.exists("dir/a.txt").await.unwrap());
    assert!(!storage.exists("dir/b.txt").await.unwrap());
    assert!(!storage.exists("dir").await.unwrap());
}

#[tokio::test]
async fn test_delete_removes_empty_child_directories() {
    let (_dir, storage) = storage();
    storage.save("dir/a.txt", b"a").await.unwrap();
    fs::create_dir_all(storage.base().join("dir/empty")).unwrap();

    storage.delete("dir").await.unwrap();

    assert!(!storage.exists("dir").await.unwrap());
}

// Delete goes one level deep only: a non-empty nested directory is not
// recursed into, so the call fails before anything is removed.
#[tokio::test]
async fn test_delete_does_not_recurse_into_nested_directories() {
    let (_dir, storage) = storage();
    storage.save("dir/a.txt", b"a").await.unwrap();
    storage.save("dir/sub/b.txt", b"b").await.unwrap();

    let err = storage.delete("dir").await.unwrap_err();

    assert!(
        matches!(err, StorageError::DirectoryNotEmpty { ref location } if location.ends_with("sub")),
        "got {:?}",
        err
    );
    assert!(storage.exists("dir/sub/b.txt").await.unwrap());
    assert!(storage.exists("dir/a.txt").await.unwrap());
    assert!(storage.exists("dir").await.unwrap());
}

#[tokio::test]
async fn test_list_files_missing_path_is_empty() {
    let (_dir, storage) = storage();

    assert!(storage.list_files("nowhere").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_files_returns_immediate_children_only() {
    let (_dir, storage) = storage();
    storage.save("dir/a.txt", b"a").await.unwrap();
    storage.save("dir/sub/b.txt", b"b").await.unwrap();

    let mut names = storage.list_files("dir").await.unwrap();
    names.sort();

    assert_eq!(names, vec!["a.txt".to_string(), "sub".to_string()]);
}

#[tokio::test]
async fn test_list_files_of_root() {
    let (_dir, storage) = storage();
    storage.save("raw/x.json", b"x").await.unwrap();
    storage.save("refined/y.json", b"y").await.unwrap();

    let mut names = storage.list_files("").await.unwrap();
    names.sort();

    assert_eq!(names, vec!["raw".to_string(), "refined".to_string()]);
}

#[test]
fn test_resolve_needs_no_backend() {
    let storage = LocalStorage::new("/srv/lake");

    assert_eq!(
        storage.resolve("raw/playlists.json"),
        Location::Local("/srv/lake/raw/playlists.json".into())
    );
    assert_eq!(storage.root(), &StorageRoot::Local("/srv/lake".into()));
}

use std::{
    collections::HashMap,
    path::Path,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use serde_json::{Value, json};
use spotlake::{
    error::{ProcessError, StorageError},
    process::{self, GetRawDataFromSource, Process},
    source::DataSource,
    storage::{LocalStorage, Storage, StorageRoot},
};
use tempfile::TempDir;

#[derive(Default)]
struct FakeSource {
    playlists: Option<Value>,
    metadata: HashMap<String, Value>,
    tracks: HashMap<String, Value>,
}

impl FakeSource {
    fn with_playlists(ids: &[&str]) -> Self {
        let items: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "id": id, "name": format!("Playlist {}", id) }))
            .collect();
        let mut source = FakeSource {
            playlists: Some(json!({ "items": items, "next": null, "total": ids.len() })),
            ..Default::default()
        };
        for id in ids {
            source
                .metadata
                .insert(id.to_string(), json!({ "id": id, "tracks": { "total": 1 } }));
            source.tracks.insert(
                id.to_string(),
                json!({ "items": [{ "track": { "id": format!("{}-t1", id), "name": "Song" } }] }),
            );
        }
        source
    }
}

#[async_trait]
impl DataSource for FakeSource {
    async fn get_playlists(&self) -> Option<Value> {
        self.playlists.clone()
    }

    async fn get_playlist(&self, playlist_id: &str) -> Option<Value> {
        self.metadata.get(playlist_id).cloned()
    }

    async fn get_playlist_tracks(&self, playlist_id: &str) -> Option<Value> {
        self.tracks.get(playlist_id).cloned()
    }
}

/// Local storage whose saves start failing after a number of successful ones,
/// or always fail for one path.
struct FailingStorage {
    inner: LocalStorage,
    saves_left: AtomicUsize,
    failing_path: Option<String>,
}

impl FailingStorage {
    fn after(base: &Path, saves: usize) -> Self {
        FailingStorage {
            inner: LocalStorage::new(base),
            saves_left: AtomicUsize::new(saves),
            failing_path: None,
        }
    }

    fn on_path(base: &Path, path: &str) -> Self {
        FailingStorage {
            inner: LocalStorage::new(base),
            saves_left: AtomicUsize::new(usize::MAX),
            failing_path: Some(path.to_string()),
        }
    }
}

#[async_trait]
impl Storage for FailingStorage {
    fn root(&self) -> &StorageRoot {
        self.inner.root()
    }

    async fn save(&self, relative_path: &str, data: &[u8]) -> Result<(), StorageError> {
        let left = self.saves_left.load(Ordering::SeqCst);
        if left == 0 || self.failing_path.as_deref() == Some(relative_path) {
            return Err(StorageError::Io {
                location: relative_path.to_string(),
                source: std::io::Error::other("disk full"),
            });
        }
        self.saves_left.store(left - 1, Ordering::SeqCst);
        self.inner.save(relative_path, data).await
    }

    async fn load(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        self.inner.load(relative_path).await
    }

    async fn exists(&self, relative_path: &str) -> Result<bool, StorageError> {
        self.inner.exists(relative_path).await
    }

    async fn delete(&self, relative_path: &str) -> Result<(), StorageError> {
        self.inner.delete(relative_path).await
    }

    async fn list_files(&self, relative_path: &str) -> Result<Vec<String>, StorageError> {
        self.inner.list_files(relative_path).await
    }
}

fn local() -> (TempDir, Arc<LocalStorage>) {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(LocalStorage::new(dir.path()));
    (dir, storage)
}

async fn load_json(storage: &LocalStorage, path: &str) -> Value {
    serde_json::from_slice(&storage.load(path).await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_raw_ingestion_persists_playlists_and_tracks() {
    let (_dir, storage) = local();
    let source = Arc::new(FakeSource::with_playlists(&["p1", "p2"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-test", source, storage.clone(), "raw");

    process::execute(&mut job).await.unwrap();

    let listing = load_json(&storage, "raw/playlists.json").await;
    assert_eq!(listing["items"].as_array().unwrap().len(), 2);

    let metadata = load_json(&storage, "raw/playlists/p1/playlist.json").await;
    assert_eq!(metadata["id"], "p1");

    let tracks = load_json(&storage, "raw/playlists/p2/tracks.json").await;
    assert_eq!(tracks["items"][0]["track"]["id"], "p2-t1");

    let mut ids = storage.list_files("raw/playlists").await.unwrap();
    ids.sort();
    assert_eq!(ids, vec!["p1".to_string(), "p2".to_string()]);

    assert_eq!(job.summary().playlists, 2);
    assert_eq!(job.summary().records_written, 5);
    assert_eq!(job.summary().records_skipped, 0);
}

#[tokio::test]
async fn test_successful_run_is_kept_by_clean() {
    let (_dir, storage) = local();
    let source = Arc::new(FakeSource::with_playlists(&["p1"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-keep", source, storage.clone(), "raw");

    job.run().await.unwrap();
    job.clean().await.unwrap();
    job.clean().await.unwrap();

    assert!(storage.exists("raw/playlists/p1/tracks.json").await.unwrap());
}

#[tokio::test]
async fn test_no_playlists_persists_nothing() {
    let (_dir, storage) = local();
    let source = Arc::new(FakeSource::default());
    let mut job = GetRawDataFromSource::new("raw-ingest-empty", source, storage.clone(), "raw");

    process::execute(&mut job).await.unwrap();

    assert!(!storage.exists("raw").await.unwrap());
    assert_eq!(job.summary().records_written, 0);
}

#[tokio::test]
async fn test_missing_records_are_skipped() {
    let (_dir, storage) = local();
    let mut source = FakeSource::with_playlists(&["p1", "p2"]);
    source.tracks.remove("p1");
    source.metadata.remove("p2");
    let mut job =
        GetRawDataFromSource::new("raw-ingest-skip", Arc::new(source), storage.clone(), "raw");

    process::execute(&mut job).await.unwrap();

    assert!(storage.exists("raw/playlists/p1/playlist.json").await.unwrap());
    assert!(!storage.exists("raw/playlists/p1/tracks.json").await.unwrap());
    assert!(!storage.exists("raw/playlists/p2/playlist.json").await.unwrap());
    assert!(storage.exists("raw/playlists/p2/tracks.json").await.unwrap());
    assert_eq!(job.summary().records_skipped, 2);
}

#[tokio::test]
async fn test_listing_items_without_id_are_ignored() {
    let (_dir, storage) = local();
    let mut source = FakeSource::with_playlists(&["p1"]);
    source.playlists = Some(json!({ "items": [{ "name": "no id" }, { "id": "p1", "name": "ok" }] }));
    let mut job =
        GetRawDataFromSource::new("raw-ingest-noid", Arc::new(source), storage.clone(), "raw");

    process::execute(&mut job).await.unwrap();

    assert_eq!(
        storage.list_files("raw/playlists").await.unwrap(),
        vec!["p1".to_string()]
    );
}

#[tokio::test]
async fn test_storage_failure_aborts_and_clean_rolls_back() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FailingStorage::after(dir.path(), 2));
    let source = Arc::new(FakeSource::with_playlists(&["p1", "p2"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-abort", source, storage.clone(), "raw");

    let err = process::execute(&mut job).await.unwrap_err();

    assert!(matches!(err, ProcessError::Storage(StorageError::Io { .. })));
    assert!(!storage.exists("raw/playlists.json").await.unwrap());
    assert!(!storage.exists("raw/playlists/p1").await.unwrap());
    assert!(job.written().is_empty());
}

#[tokio::test]
async fn test_rollback_keeps_foreign_files() {
    let dir = tempfile::tempdir().unwrap();
    let inner = LocalStorage::new(dir.path());
    inner
        .save("raw/playlists/p1/notes.txt", b"from an earlier run")
        .await
        .unwrap();
    let storage = Arc::new(FailingStorage::after(dir.path(), 2));
    let source = Arc::new(FakeSource::with_playlists(&["p1"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-foreign", source, storage.clone(), "raw");

    assert!(process::execute(&mut job).await.is_err());

    assert!(!storage.exists("raw/playlists/p1/playlist.json").await.unwrap());
    assert!(storage.exists("raw/playlists/p1/notes.txt").await.unwrap());
}

async fn ingest_once(storage: Arc<LocalStorage>, ids: &[&str]) {
    let source = Arc::new(FakeSource::with_playlists(ids));
    let mut job = GetRawDataFromSource::new("raw-ingest-first-run", source, storage, "raw");
    process::execute(&mut job).await.unwrap();
}

#[tokio::test]
async fn test_failed_rerun_restores_previous_run() {
    let (dir, storage) = local();
    ingest_once(storage.clone(), &["p1"]).await;
    let listing_before = storage.load("raw/playlists.json").await.unwrap();
    let metadata_before = storage.load("raw/playlists/p1/playlist.json").await.unwrap();

    let mut source = FakeSource::with_playlists(&["p1"]);
    source
        .metadata
        .insert("p1".to_string(), json!({ "id": "p1", "name": "renamed" }));
    let failing = Arc::new(FailingStorage::on_path(
        dir.path(),
        "raw/playlists/p1/tracks.json",
    ));
    let mut job =
        GetRawDataFromSource::new("raw-ingest-rerun", Arc::new(source), failing, "raw");

    let err = process::execute(&mut job).await.unwrap_err();

    assert!(matches!(err, ProcessError::Storage(StorageError::Io { .. })));
    assert_eq!(storage.load("raw/playlists.json").await.unwrap(), listing_before);
    assert_eq!(
        storage.load("raw/playlists/p1/playlist.json").await.unwrap(),
        metadata_before
    );
    let tracks = load_json(&storage, "raw/playlists/p1/tracks.json").await;
    assert_eq!(tracks["items"][0]["track"]["id"], "p1-t1");
}

#[tokio::test]
async fn test_failed_rerun_keeps_previous_files_when_restore_fails() {
    let (dir, storage) = local();
    ingest_once(storage.clone(), &["p1"]).await;

    let failing = Arc::new(FailingStorage::after(dir.path(), 1));
    let source = Arc::new(FakeSource::with_playlists(&["p1"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-rerun-broken", source, failing, "raw");

    assert!(process::execute(&mut job).await.is_err());

    assert!(storage.exists("raw/playlists.json").await.unwrap());
    assert!(storage.exists("raw/playlists/p1/playlist.json").await.unwrap());
    assert!(storage.exists("raw/playlists/p1/tracks.json").await.unwrap());
}

#[tokio::test]
async fn test_failed_rerun_removes_only_new_playlists() {
    let (dir, storage) = local();
    ingest_once(storage.clone(), &["p1"]).await;

    let failing = Arc::new(FailingStorage::on_path(
        dir.path(),
        "raw/playlists/p2/tracks.json",
    ));
    let source = Arc::new(FakeSource::with_playlists(&["p1", "p2"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-rerun-new", source, failing, "raw");

    assert!(process::execute(&mut job).await.is_err());

    let listing = load_json(&storage, "raw/playlists.json").await;
    assert_eq!(listing["items"].as_array().unwrap().len(), 1);
    assert!(storage.exists("raw/playlists/p1/playlist.json").await.unwrap());
    assert!(storage.exists("raw/playlists/p1/tracks.json").await.unwrap());
    assert!(!storage.exists("raw/playlists/p2").await.unwrap());
    assert!(job.written().is_empty());
}

#[tokio::test]
async fn test_run_twice_fails() {
    let (_dir, storage) = local();
    let source = Arc::new(FakeSource::with_playlists(&["p1"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-twice", source, storage, "raw");

    job.run().await.unwrap();
    let err = job.run().await.unwrap_err();

    assert!(matches!(err, ProcessError::AlreadyRan(ref name) if name == "raw-ingest-twice"));
}

#[tokio::test]
async fn test_clean_before_run_is_a_noop() {
    let (_dir, storage) = local();
    let source = Arc::new(FakeSource::with_playlists(&["p1"]));
    let mut job = GetRawDataFromSource::new("raw-ingest-clean-first", source, storage, "raw");

    job.clean().await.unwrap();
    assert_eq!(job.name(), "raw-ingest-clean-first");
    assert_eq!(job.logger().name(), "raw-ingest-clean-first");
}

#[tokio::test]
async fn test_same_name_shares_one_logger() {
    let (_dir, storage) = local();
    let first = GetRawDataFromSource::new(
        "raw-ingest-shared-logger",
        Arc::new(FakeSource::default()),
        storage.clone(),
        "raw",
    );
    let second = GetRawDataFromSource::new(
        "raw-ingest-shared-logger",
        Arc::new(FakeSource::default()),
        storage,
        "raw",
    );

    assert!(std::ptr::eq(first.logger(), second.logger()));
}

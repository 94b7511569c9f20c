use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::Process;
use crate::{
    config::{Settings, Zone},
    error::ProcessError,
    logging::{self, Logger},
    source::DataSource,
    spotify::SpotifyClient,
    storage::{self, Storage, StorageRoot},
    types::IngestSummary,
    utils,
};

/// What a run did to one path, and therefore how to undo it.
#[derive(Debug)]
enum Change {
    /// Nothing was stored at the path before the run.
    Created(String),
    /// The path held these bytes before the run overwrote it.
    Replaced(String, Vec<u8>),
}

impl Change {
    fn path(&self) -> &str {
        match self {
            Change::Created(path) | Change::Replaced(path, _) => path,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    NotStarted,
    Running,
    Completed,
    Failed,
}

/// Copies the user's playlists and their tracks, unmodified, into the raw
/// zone.
///
/// Layout under the raw zone:
///
/// ```text
/// <raw>/playlists.json                  listing returned by the source
/// <raw>/playlists/<id>/playlist.json    playlist metadata
/// <raw>/playlists/<id>/tracks.json      all tracks of the playlist
/// ```
///
/// A record the source cannot deliver is skipped with a warning. A storage
/// failure aborts the run; `clean` then puts back what an earlier run had
/// stored at the overwritten paths and removes the files this run created.
pub struct GetRawDataFromSource {
    name: String,
    logger: Arc<Logger>,
    source: Arc<dyn DataSource>,
    storage: Arc<dyn Storage>,
    raw_zone: String,
    state: RunState,
    changes: Vec<Change>,
    playlist_dirs: Vec<String>,
    summary: IngestSummary,
}

impl GetRawDataFromSource {
    /// Creates the job with explicitly injected collaborators.
    ///
    /// # Arguments
    ///
    /// * `name` - Process name, also the name of its logger
    /// * `source` - Where playlists and tracks are read from
    /// * `storage` - Where the raw records are written to
    /// * `raw_zone` - Path of the raw zone relative to the storage root;
    ///   surrounding `/` are ignored
    ///
    /// # Returns
    ///
    /// A job that has not run yet. Nothing is read or written until
    /// [`Process::run`] is awaited.
    pub fn new(
        name: &str,
        source: Arc<dyn DataSource>,
        storage: Arc<dyn Storage>,
        raw_zone: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            logger: logging::logger(name),
            source,
            storage,
            raw_zone: raw_zone.trim_matches('/').to_string(),
            state: RunState::NotStarted,
            changes: Vec::new(),
            playlist_dirs: Vec::new(),
            summary: IngestSummary::default(),
        }
    }

    /// Builds the Spotify client and the storage named in `settings`.
    ///
    /// # Errors
    ///
    /// Fails fast with [`ProcessError::Config`] when no token was stored by
    /// `spotlake auth`, and with [`ProcessError::Storage`] when the base path
    /// names an unsupported storage root.
    pub async fn from_settings(name: &str, settings: &Settings) -> Result<Self, ProcessError> {
        let source = SpotifyClient::from_credentials(settings.credentials.clone()).await?;
        let root = StorageRoot::parse(&settings.storage.base_path)?;
        let storage = storage::open(root, &settings.storage.s3).await?;
        Ok(Self::new(
            name,
            Arc::new(source),
            storage,
            settings.storage.zone(Zone::Raw),
        ))
    }

    /// Counters of the current run.
    pub fn summary(&self) -> &IngestSummary {
        &self.summary
    }

    /// Paths the current run has written or tried to write, in write order.
    /// Emptied once `clean` has released or rolled them back.
    pub fn written(&self) -> Vec<&str> {
        self.changes.iter().map(Change::path).collect()
    }

    fn zone_path(&self, relative: &str) -> String {
        if self.raw_zone.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.raw_zone, relative)
        }
    }

    async fn write(&mut self, path: String, record: &Value) -> Result<(), ProcessError> {
        let data = serde_json::to_vec_pretty(record)?;
        if !self.changes.iter().any(|change| change.path() == path) {
            let change = match self.storage.load(&path).await {
                Ok(previous) => Change::Replaced(path.clone(), previous),
                Err(e) if e.is_not_found() => Change::Created(path.clone()),
                Err(e) => return Err(e.into()),
            };
            // Recorded before the write so a partial write is still undone.
            self.changes.push(change);
        }
        self.storage.save(&path, &data).await?;
        self.summary.records_written += 1;
        Ok(())
    }

    async fn ingest(&mut self) -> Result<(), ProcessError> {
        let Some(listing) = self.source.get_playlists().await else {
            self.logger
                .warning("Data source returned no playlists, nothing to persist");
            return Ok(());
        };

        self.write(self.zone_path("playlists.json"), &listing).await?;

        let playlists = utils::playlist_refs(&listing);
        self.logger
            .info(format!("Found {} playlists", playlists.len()));

        for playlist in playlists {
            let dir = self.zone_path(&format!("playlists/{}", utils::path_segment(&playlist.id)));
            if !self.playlist_dirs.contains(&dir) {
                self.playlist_dirs.push(dir.clone());
            }

            match self.source.get_playlist(&playlist.id).await {
                Some(metadata) => {
                    self.write(format!("{}/playlist.json", dir), &metadata)
                        .await?
                }
                None => {
                    self.summary.records_skipped += 1;
                    self.logger.warning(format!(
                        "Skipping metadata of playlist {} ({}): no data",
                        playlist.id, playlist.name
                    ));
                }
            }

            match self.source.get_playlist_tracks(&playlist.id).await {
                Some(tracks) => self.write(format!("{}/tracks.json", dir), &tracks).await?,
                None => {
                    self.summary.records_skipped += 1;
                    self.logger.warning(format!(
                        "Skipping tracks of playlist {} ({}): no data",
                        playlist.id, playlist.name
                    ));
                }
            }

            self.summary.playlists += 1;
            self.logger.debug(format!("Stored playlist {}", playlist.id));
        }

        self.logger.info(format!(
            "Stored {} playlists ({} records written, {} skipped)",
            self.summary.playlists, self.summary.records_written, self.summary.records_skipped
        ));
        Ok(())
    }

    /// Undoes the run newest first: restores the previous content of
    /// overwritten paths, deletes created files, then removes the playlist
    /// directories that are left empty. Keeps going after a failure and
    /// returns the first error.
    async fn rollback(&mut self) -> Result<(), ProcessError> {
        let mut first_error = None;
        let changes: Vec<Change> = self.changes.drain(..).rev().collect();
        let dirs: Vec<String> = self.playlist_dirs.drain(..).collect();

        let (mut restored, mut deleted) = (0, 0);
        for change in &changes {
            let result = match change {
                Change::Created(path) => self.storage.delete(path).await,
                Change::Replaced(path, previous) => self.storage.save(path, previous).await,
            };
            match result {
                Ok(()) if matches!(change, Change::Created(_)) => deleted += 1,
                Ok(()) => restored += 1,
                Err(e) => {
                    self.logger
                        .error(format!("Cannot roll back {}: {}", change.path(), e));
                    first_error.get_or_insert(e);
                }
            }
        }

        for dir in &dirs {
            let leftover = match self.storage.list_files(dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    first_error.get_or_insert(e);
                    continue;
                }
            };
            if leftover.is_empty() {
                if let Err(e) = self.storage.delete(dir).await {
                    first_error.get_or_insert(e);
                }
            }
        }

        self.logger.info(format!(
            "Rolled back {} records ({} restored, {} deleted)",
            changes.len(),
            restored,
            deleted
        ));
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Process for GetRawDataFromSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn logger(&self) -> &Logger {
        &self.logger
    }

    async fn run(&mut self) -> Result<(), ProcessError> {
        if self.state != RunState::NotStarted {
            return Err(ProcessError::AlreadyRan(self.name.clone()));
        }

        self.state = RunState::Running;
        let result = self.ingest().await;
        self.state = if result.is_ok() {
            RunState::Completed
        } else {
            RunState::Failed
        };
        result
    }

    async fn clean(&mut self) -> Result<(), ProcessError> {
        match self.state {
            RunState::Completed => {
                self.changes.clear();
                self.playlist_dirs.clear();
                Ok(())
            }
            _ if self.changes.is_empty() && self.playlist_dirs.is_empty() => Ok(()),
            _ => self.rollback().await,
        }
    }
}

//! The data-source seam used by ingestion processes.

use async_trait::async_trait;
use serde_json::Value;

/// Read-only access to a user's music library.
///
/// Implementations catch every transport, auth and decoding failure and
/// return `None` instead, so callers treat "no data" and "error" alike.
/// Paginated endpoints are fully traversed before returning.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// The current user's playlists, as a page object with all `items`.
    async fn get_playlists(&self) -> Option<Value>;

    async fn get_playlist(&self, playlist_id: &str) -> Option<Value>;

    /// All tracks of a playlist, as a page object with all `items`.
    async fn get_playlist_tracks(&self, playlist_id: &str) -> Option<Value>;
}

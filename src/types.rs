use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::config::Credentials;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub scope: String,
    pub expires_in: u64,
    pub obtained_at: u64,
}

/// State shared between the OAuth flow and the callback handler.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub code_verifier: String,
    pub credentials: Credentials,
    pub token: Option<Token>,
}

/// Minimal view of a playlist listing item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Tabled)]
pub struct EntryTableRow {
    pub name: String,
}

#[derive(Tabled)]
pub struct ZoneTableRow {
    pub zone: String,
    pub path: String,
    pub location: String,
    pub exists: String,
}

/// Counters reported at the end of an ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub playlists: usize,
    pub records_written: usize,
    pub records_skipped: usize,
}

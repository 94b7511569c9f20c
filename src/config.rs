//! Configuration management for spotlake.
//!
//! Two sources feed the configuration:
//! 1. Environment variables (optionally loaded from `.env` files) holding the
//!    Spotify application credentials and endpoint overrides.
//! 2. A TOML settings document describing where the storage zones live.
//!
//! Both are combined into [`Settings`], which is built once by the binary and
//! handed to whatever needs it. Nothing here panics: a missing required value
//! is reported as a [`ConfigError`] before any I/O happens.

use std::{
    env,
    net::SocketAddr,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const DEFAULT_SCOPE: &str = "playlist-read-private playlist-read-collaborative";
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:8888";
pub const DEFAULT_SETTINGS_FILE: &str = "config.toml";

/// Returns the per-user data directory, e.g. `~/.local/share/spotlake` on Linux.
pub fn data_dir() -> PathBuf {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("spotlake");
    path
}

/// Loads environment variables from `.env` files.
///
/// The file in the local data directory is read first, then `./.env`.
/// Variables already present in the environment are never overwritten and
/// missing files are not an error.
pub async fn load_env() -> Result<(), String> {
    let dir = data_dir();
    async_fs::create_dir_all(&dir)
        .await
        .map_err(|e| e.to_string())?;

    let path = dir.join(".env");
    if path.is_file() {
        dotenv::from_path(&path).map_err(|e| e.to_string())?;
    }
    if Path::new(".env").is_file() {
        dotenv::dotenv().map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Credentials and endpoints for the Spotify Web API.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub scope: String,
    pub api_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub server_address: String,
}

impl Credentials {
    /// Reads credentials from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads credentials through `lookup`; empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        Ok(Self {
            client_id: required("SOURCE_CLIENT_ID")?,
            client_secret: required("SOURCE_CLIENT_SECRET")?,
            redirect_uri: required("SOURCE_REDIRECT_URI")?,
            scope: get("SOURCE_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            api_url: get("SOURCE_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            auth_url: get("SOURCE_AUTH_URL").unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: get("SOURCE_TOKEN_URL").unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            server_address: get("SERVER_ADDRESS")
                .unwrap_or_else(|| DEFAULT_SERVER_ADDRESS.to_string()),
        })
    }

    /// Parses the address the OAuth callback server binds to.
    pub fn server_addr(&self) -> Result<SocketAddr, ConfigError> {
        SocketAddr::from_str(&self.server_address)
            .map_err(|_| ConfigError::InvalidServerAddress(self.server_address.clone()))
    }
}

/// Object-store connection overrides; every field falls back to the AWS
/// provider chain when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct S3Settings {
    pub region: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub path_style: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    pub base_path: String,
    pub raw_zone: String,
    pub processed_zone: String,
    pub refined_zone: String,
    #[serde(default)]
    pub s3: S3Settings,
}

/// A named subdivision of the storage root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Raw,
    Processed,
    Refined,
}

impl Zone {
    pub const ALL: [Zone; 3] = [Zone::Raw, Zone::Processed, Zone::Refined];

    pub fn label(self) -> &'static str {
        match self {
            Zone::Raw => "raw",
            Zone::Processed => "processed",
            Zone::Refined => "refined",
        }
    }
}

impl StorageSettings {
    pub fn zone(&self, zone: Zone) -> &str {
        match zone {
            Zone::Raw => &self.raw_zone,
            Zone::Processed => &self.processed_zone,
            Zone::Refined => &self.refined_zone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct SettingsDocument {
    storage: StorageSettings,
}

/// Parses a TOML settings document. `origin` only labels errors.
pub fn parse_storage_settings(origin: &str, text: &str) -> Result<StorageSettings, ConfigError> {
    let doc: SettingsDocument = toml::from_str(text).map_err(|e| ConfigError::Settings {
        path: origin.to_string(),
        message: e.message().to_string(),
    })?;
    Ok(doc.storage)
}

/// Reads and parses the settings document at `path`.
pub async fn load_storage_settings(path: &Path) -> Result<StorageSettings, ConfigError> {
    let text = async_fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Settings {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    parse_storage_settings(&path.display().to_string(), &text)
}

/// Everything a process needs to build its collaborators.
#[derive(Debug, Clone)]
pub struct Settings {
    pub credentials: Credentials,
    pub storage: StorageSettings,
}

impl Settings {
    pub async fn load(settings_path: &Path) -> Result<Self, ConfigError> {
        let credentials = Credentials::from_env()?;
        let storage = load_storage_settings(settings_path).await?;
        Ok(Self {
            credentials,
            storage,
        })
    }
}

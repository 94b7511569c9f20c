use std::path::{Path, PathBuf};

use reqwest::Client;
use serde_json::Value;

use crate::{
    config::{self, Credentials},
    error::ConfigError,
    types::Token,
    utils,
};

/// Seconds before expiry at which a token is refreshed.
const EXPIRY_MARGIN: u64 = 240;

/// Holds the OAuth token on disk and refreshes it when it is about to expire.
#[derive(Debug, Clone)]
pub struct TokenManager {
    token: Token,
    path: PathBuf,
}

impl TokenManager {
    /// Wraps `token`, stored at [`TokenManager::default_path`].
    pub fn new(token: Token) -> Self {
        Self::with_path(token, Self::default_path())
    }

    /// Wraps `token`, stored at `path` instead of the default location.
    pub fn with_path(token: Token, path: PathBuf) -> Self {
        TokenManager { token, path }
    }

    /// Location of the token written by `spotlake auth`:
    /// `<data_local_dir>/spotlake/cache/token.json`.
    pub fn default_path() -> PathBuf {
        config::data_dir().join("cache").join("token.json")
    }

    /// Loads the token stored at `path`.
    ///
    /// # Returns
    ///
    /// - `Ok(TokenManager)` - Manager that persists back to `path`
    /// - `Err(ConfigError::MissingToken)` - No readable file at `path`
    /// - `Err(ConfigError::Settings)` - The file is not a stored token
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = async_fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::MissingToken(path.display().to_string()))?;
        let token: Token =
            serde_json::from_str(&content).map_err(|e| ConfigError::Settings {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            token,
            path: path.to_path_buf(),
        })
    }

    /// Writes the token as pretty JSON, creating the parent directory.
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Token written to [`TokenManager::path`]
    /// - `Err(String)` - Directory creation, serialization or write failed
    pub async fn persist(&self) -> Result<(), String> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.token).map_err(|e| e.to_string())?;
        async_fs::write(&self.path, json)
            .await
            .map_err(|e| e.to_string())
    }

    /// Returns an access token, refreshing and persisting it first if needed.
    /// A failed refresh keeps the old token; the API call will then fail
    /// with 401 and be reported by the caller.
    pub async fn get_valid_token(&mut self, client: &Client, credentials: &Credentials) -> String {
        if self.is_expired() {
            match refresh_token(client, credentials, &self.token.refresh_token).await {
                Ok(new_token) => {
                    self.token = new_token;
                    if let Err(e) = self.persist().await {
                        tracing::warn!("Failed to persist refreshed token: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Token refresh failed: {}", e),
            }
        }

        self.token.access_token.clone()
    }

    /// Whether the token expires within the refresh margin of 240 seconds.
    pub fn is_expired(&self) -> bool {
        let now = utils::now_timestamp();
        now + EXPIRY_MARGIN >= self.token.obtained_at + self.token.expires_in
    }

    /// The token as last loaded or refreshed.
    pub fn current_token(&self) -> &Token {
        &self.token
    }

    /// Where the token is persisted.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Exchanges a refresh token for a new access token.
///
/// Spotify may omit `refresh_token` in the response, in which case the
/// previous one stays valid and is kept.
pub async fn refresh_token(
    client: &Client,
    credentials: &Credentials,
    refresh_token: &str,
) -> Result<Token, String> {
    let res = client
        .post(&credentials.token_url)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    let json: Value = res.json().await.map_err(|e| e.to_string())?;
    let mut token = token_from_json(&json)?;
    if token.refresh_token.is_empty() {
        token.refresh_token = refresh_token.to_string();
    }
    Ok(token)
}

/// Builds a [`Token`] from a token endpoint response.
pub fn token_from_json(json: &Value) -> Result<Token, String> {
    let access_token = json["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "token response has no access_token".to_string())?;

    Ok(Token {
        access_token: access_token.to_string(),
        refresh_token: json["refresh_token"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        scope: json["scope"].as_str().unwrap_or_default().to_string(),
        expires_in: json["expires_in"].as_u64().unwrap_or(3600),
        obtained_at: utils::now_timestamp(),
    })
}

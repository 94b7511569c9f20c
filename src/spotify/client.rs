use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header::RETRY_AFTER};
use serde_json::Value;
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};

use crate::{
    config::Credentials, error::ConfigError, management::TokenManager, source::DataSource,
};

const PLAYLISTS_PAGE_SIZE: u32 = 50;
const TRACKS_PAGE_SIZE: u32 = 100;

/// How transient API failures are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Wait between attempts when the response carries no `Retry-After`.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay: Duration::from_secs(10),
        }
    }
}

/// Spotify Web API client for the read-only library endpoints.
pub struct SpotifyClient {
    http: Client,
    credentials: Credentials,
    tokens: Mutex<TokenManager>,
    retry: RetryPolicy,
}

impl SpotifyClient {
    pub fn new(credentials: Credentials, tokens: TokenManager) -> Self {
        Self {
            http: Client::new(),
            credentials,
            tokens: Mutex::new(tokens),
            retry: RetryPolicy::default(),
        }
    }

    /// Builds a client from the token stored by `spotlake auth`.
    pub async fn from_credentials(credentials: Credentials) -> Result<Self, ConfigError> {
        let tokens = TokenManager::load(&TokenManager::default_path()).await?;
        Ok(Self::new(credentials, tokens))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.credentials.api_url.trim_end_matches('/'), path)
    }

    /// GETs `url` as JSON, retrying rate limits and gateway errors.
    async fn get_json(&self, url: &str) -> Result<Value, String> {
        let mut attempt = 0;

        loop {
            let token = self
                .tokens
                .lock()
                .await
                .get_valid_token(&self.http, &self.credentials)
                .await;

            let response = self
                .http
                .get(url)
                .bearer_auth(token)
                .send()
                .await
                .map_err(|e| e.to_string())?;

            let status = response.status();
            if is_retryable(status) && attempt < self.retry.max_retries {
                attempt += 1;
                let wait = retry_after(&response).unwrap_or(self.retry.delay);
                debug!(
                    "{} returned {}, retry {}/{} in {:?}",
                    url, status, attempt, self.retry.max_retries, wait
                );
                sleep(wait).await;
                continue;
            }

            let response = response.error_for_status().map_err(|e| e.to_string())?;
            return response.json::<Value>().await.map_err(|e| e.to_string());
        }
    }

    /// Follows `next` links and returns the first page holding every item.
    async fn get_all_pages(&self, url: &str) -> Result<Value, String> {
        let mut first = self.get_json(url).await?;
        let mut items = first["items"].as_array().cloned().unwrap_or_default();
        let mut next = first["next"].as_str().map(str::to_string);

        while let Some(url) = next {
            let page = self.get_json(&url).await?;
            if let Some(page_items) = page["items"].as_array() {
                items.extend(page_items.iter().cloned());
            }
            next = page["next"].as_str().map(str::to_string);
        }

        if let Some(obj) = first.as_object_mut() {
            obj.insert("items".to_string(), Value::Array(items));
            obj.insert("next".to_string(), Value::Null);
        }
        Ok(first)
    }
}

fn is_retryable(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
    )
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Turns a failed call into `None`, logging what went wrong.
fn safe(call: &str, result: Result<Value, String>) -> Option<Value> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Error calling {}: {}", call, e);
            None
        }
    }
}

#[async_trait]
impl DataSource for SpotifyClient {
    async fn get_playlists(&self) -> Option<Value> {
        let url = self.endpoint(&format!("/me/playlists?limit={}", PLAYLISTS_PAGE_SIZE));
        safe("get_playlists", self.get_all_pages(&url).await)
    }

    async fn get_playlist(&self, playlist_id: &str) -> Option<Value> {
        let url = self.endpoint(&format!("/playlists/{}", playlist_id));
        safe("get_playlist", self.get_json(&url).await)
    }

    async fn get_playlist_tracks(&self, playlist_id: &str) -> Option<Value> {
        let url = self.endpoint(&format!(
            "/playlists/{}/tracks?limit={}",
            playlist_id, TRACKS_PAGE_SIZE
        ));
        safe("get_playlist_tracks", self.get_all_pages(&url).await)
    }
}

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use reqwest::{Client, Url};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::{
    config::Credentials,
    management::{TokenManager, token_from_json},
    server::start_api_server,
    types::{AuthSession, Token},
    utils, warning,
};

const AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Runs the OAuth authorization-code flow with PKCE and stores the token.
///
/// Starts the local callback server, opens the authorization page in the
/// browser, waits for the callback to deliver a token and persists it where
/// [`TokenManager::default_path`] points.
pub async fn auth(credentials: Credentials) -> Result<Token, String> {
    let addr = credentials.server_addr().map_err(|e| e.to_string())?;

    let code_verifier = utils::generate_code_verifier();
    let code_challenge = utils::generate_code_challenge(&code_verifier);
    let auth_url = authorize_url(&credentials, &code_challenge)?;

    let shared_state = Arc::new(Mutex::new(Some(AuthSession {
        code_verifier,
        credentials,
        token: None,
    })));

    let server_state = Arc::clone(&shared_state);
    tokio::spawn(async move {
        if let Err(e) = start_api_server(server_state, addr).await {
            warning!("Callback server stopped: {}", e);
        }
    });

    if webbrowser::open(auth_url.as_str()).is_err() {
        warning!(
            "Failed to open browser. Please navigate to the following URL manually:\n{}",
            auth_url
        )
    }

    let token = wait_for_token(shared_state, AUTH_TIMEOUT)
        .await
        .ok_or_else(|| "Authentication failed or timed out.".to_string())?;

    TokenManager::new(token.clone())
        .persist()
        .await
        .map_err(|e| format!("Failed to save token to cache: {}", e))?;

    Ok(token)
}

/// Builds the authorization page URL for the PKCE flow.
pub fn authorize_url(credentials: &Credentials, code_challenge: &str) -> Result<Url, String> {
    Url::parse_with_params(
        &credentials.auth_url,
        &[
            ("client_id", credentials.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", credentials.redirect_uri.as_str()),
            ("code_challenge", code_challenge),
            ("code_challenge_method", "S256"),
            ("scope", credentials.scope.as_str()),
        ],
    )
    .map_err(|e| format!("Invalid authorization URL {}: {}", credentials.auth_url, e))
}

/// Polls the shared session until the callback stored a token or `max_wait`
/// elapsed.
async fn wait_for_token(
    shared_state: Arc<Mutex<Option<AuthSession>>>,
    max_wait: Duration,
) -> Option<Token> {
    let start = Instant::now();

    while start.elapsed() < max_wait {
        {
            let lock = shared_state.lock().await;
            if let Some(token) = lock.as_ref().and_then(|s| s.token.as_ref()) {
                return Some(token.clone());
            }
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    None
}

/// Exchanges an authorization code for a token.
pub async fn exchange_code(
    credentials: &Credentials,
    code: &str,
    verifier: &str,
) -> Result<Token, String> {
    let res = Client::new()
        .post(&credentials.token_url)
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("code_verifier", verifier),
            ("redirect_uri", credentials.redirect_uri.as_str()),
        ])
        .send()
        .await
        .map_err(|e| e.to_string())?
        .error_for_status()
        .map_err(|e| e.to_string())?;

    let json: Value = res.json().await.map_err(|e| e.to_string())?;
    token_from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::from_lookup(|key| match key {
            "SOURCE_CLIENT_ID" => Some("client".to_string()),
            "SOURCE_CLIENT_SECRET" => Some("secret".to_string()),
            "SOURCE_REDIRECT_URI" => Some("http://127.0.0.1:8888/callback".to_string()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn authorize_url_carries_pkce_parameters() {
        let url = authorize_url(&credentials(), "challenge").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(url.as_str().starts_with("https://accounts.spotify.com/authorize?"));
        assert!(pairs.contains(&("client_id".to_string(), "client".to_string())));
        assert!(pairs.contains(&("code_challenge_method".to_string(), "S256".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://127.0.0.1:8888/callback".to_string()
        )));
        assert!(pairs.contains(&(
            "scope".to_string(),
            "playlist-read-private playlist-read-collaborative".to_string()
        )));
    }

    #[tokio::test]
    async fn wait_for_token_returns_stored_token() {
        let token = Token {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            scope: String::new(),
            expires_in: 3600,
            obtained_at: 0,
        };
        let state = Arc::new(Mutex::new(Some(AuthSession {
            code_verifier: "v".to_string(),
            credentials: credentials(),
            token: Some(token.clone()),
        })));

        let got = wait_for_token(state, Duration::from_secs(5)).await;
        assert_eq!(got, Some(token));
    }

    #[tokio::test]
    async fn wait_for_token_gives_up() {
        let state = Arc::new(Mutex::new(None));
        let got = wait_for_token(state, Duration::ZERO).await;
        assert_eq!(got, None);
    }
}

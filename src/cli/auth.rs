use crate::{config::Credentials, error, management::TokenManager, spotify, success};

pub async fn auth() {
    let credentials = match Credentials::from_env() {
        Ok(c) => c,
        Err(e) => error!("Cannot start authentication: {}", e),
    };

    match spotify::auth::auth(credentials).await {
        Ok(token) => success!(
            "Authentication successful! Token for scope '{}' stored at {}",
            token.scope,
            TokenManager::default_path().display()
        ),
        Err(e) => error!("{}", e),
    }
}

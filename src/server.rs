use axum::{Extension, Router, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;

use crate::{api, types::AuthSession};

pub fn router(state: Arc<Mutex<Option<AuthSession>>>) -> Router {
    Router::new()
        .route("/health", get(api::health))
        .route("/callback", get(api::callback).layer(Extension(state)))
}

pub async fn start_api_server(
    state: Arc<Mutex<Option<AuthSession>>>,
    addr: SocketAddr,
) -> Result<(), String> {
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| format!("Failed to bind {}: {}", addr, e))?;
    axum::serve(listener, router(state))
        .await
        .map_err(|e| e.to_string())
}

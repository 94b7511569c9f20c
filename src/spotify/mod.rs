//! # Spotify Integration Module
//!
//! The Spotify Web API side of spotlake: the OAuth flow that obtains a token
//! and the client that reads the user's library with it.
//!
//! ```text
//! Processes (ingestion jobs)
//!          ↓
//! DataSource trait
//!          ↓
//! SpotifyClient  ── TokenManager (refresh, persist)
//!          ↓
//! HTTP Layer (reqwest, JSON)
//!          ↓
//! Spotify Web API
//! ```
//!
//! ## Modules
//!
//! - [`auth`] - OAuth 2.0 authorization-code flow with PKCE. Starts the local
//!   callback server, opens the browser and persists the resulting token.
//! - [`SpotifyClient`] - implements [`crate::source::DataSource`] for the
//!   playlist endpoints:
//!   - `GET /me/playlists` (paginated, 50 per page)
//!   - `GET /playlists/{id}`
//!   - `GET /playlists/{id}/tracks` (paginated, 100 per page)
//!
//! ## Error Handling
//!
//! The client never returns errors to ingestion code. Network failures,
//! non-success statuses and undecodable bodies are logged with `tracing` and
//! reported as `None`. Rate limits (429) and gateway errors (502, 503) are
//! retried according to [`RetryPolicy`], honoring `Retry-After` when present.
//!
//! ## Authentication
//!
//! Every request carries a bearer token from the [`crate::management::TokenManager`].
//! Tokens are refreshed shortly before they expire using the client id and
//! secret, and the refreshed token is written back to disk.

pub mod auth;
mod client;

pub use client::RetryPolicy;
pub use client::SpotifyClient;

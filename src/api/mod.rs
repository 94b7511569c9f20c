//! # API Module
//!
//! HTTP endpoints served by the local callback server during `spotlake auth`.
//!
//! - [`callback`] - receives the authorization code from Spotify and
//!   exchanges it for a token, completing the PKCE flow.
//! - [`health`] - reports status and version.
//!
//! Both are plain async handlers wired up in [`crate::server::router`].

mod callback;
mod health;

pub use callback::callback;
pub use health::health;

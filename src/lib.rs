//! Spotify library ingestion into a layered storage area.
//!
//! spotlake pulls a user's playlists and tracks from the Spotify Web API and
//! writes them, unmodified, into the raw zone of a storage root that can be a
//! local directory or an S3 bucket prefix. Later pipeline stages read from
//! there and write the processed and refined zones.
//!
//! # Modules
//!
//! - `storage` - uniform save/load/exists/delete/list over local or S3 roots
//! - `process` - the ingestion job contract and its implementations
//! - `source` - the data-source trait processes read from
//! - `spotify` - Spotify Web API client and OAuth flow
//! - `management` - persisted OAuth token handling
//! - `config` - environment credentials and the TOML settings document
//! - `logging` - named process loggers and tracing setup
//! - `api`, `server` - local callback server used during authentication
//! - `cli` - command-line interface implementations
//!
//! # Example
//!
//! ```
//! use spotlake::storage::{LocalStorage, Storage};
//!
//! #[tokio::main]
//! async fn main() -> spotlake::Res<()> {
//!     let storage = LocalStorage::new("./data");
//!     storage.save("greeting.txt", b"hello").await?;
//!     assert_eq!(storage.load("greeting.txt").await?, b"hello");
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod management;
pub mod process;
pub mod server;
pub mod source;
pub mod spotify;
pub mod storage;
pub mod types;
pub mod utils;

/// Result alias for top-level command plumbing.
///
/// Library code returns the typed errors from [`error`]; commands collect
/// them into this boxed form before reporting.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints a user-facing status line with a blue `o` marker.
///
/// ```
/// info!("Listing {}", root);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a user-facing confirmation with a green check mark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    println!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a red error line and exits with status 1.
///
/// Only for the command layer; library code returns errors instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a yellow warning line for recoverable problems.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}

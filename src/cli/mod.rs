//! # CLI Module
//!
//! User-facing commands. Each command loads the configuration it needs,
//! delegates to the library modules and reports the outcome with the
//! `info!`/`success!`/`warning!`/`error!` output macros.
//!
//! ## Commands
//!
//! - [`auth`] - authorize spotlake with Spotify (OAuth 2.0 PKCE)
//! - [`run`] - execute an ingestion process
//! - [`ls`] - list the immediate entries under a storage path
//! - [`info`] - show the storage root and the state of each zone
//!
//! ## Usage
//!
//! ```bash
//! spotlake auth                       # Authorize once, stores the token
//! spotlake run raw                    # Copy playlists and tracks into the raw zone
//! spotlake ls raw/playlists           # Inspect what was written
//! spotlake info --config lake.toml    # Check zones for another settings file
//! ```
//!
//! `auth` and `run` need the `SOURCE_*` credentials in the environment;
//! `ls` and `info` only read the settings document.

mod auth;
mod info;
mod ls;
mod run;

use std::{path::Path, sync::Arc};

use crate::{
    Res,
    config::{self, StorageSettings},
    storage::{self, Storage, StorageRoot},
};

pub use auth::auth;
pub use info::info;
pub use ls::ls;
pub use run::run;

/// Loads the settings document and opens the storage it names.
async fn open_storage(settings_path: &Path) -> Res<(StorageSettings, Arc<dyn Storage>)> {
    let settings = config::load_storage_settings(settings_path).await?;
    let root = StorageRoot::parse(&settings.base_path)?;
    let storage = storage::open(root, &settings.s3).await?;
    Ok((settings, storage))
}

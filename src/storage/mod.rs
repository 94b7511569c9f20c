//! # Storage
//!
//! A small, backend-agnostic interface over a hierarchical path space. Every
//! operation takes a path relative to a configured root, so ingestion code
//! never has to know whether it is writing to a local directory or to an
//! object store bucket.
//!
//! ```text
//! StorageRoot::parse("s3://lake/music")  -> S3Storage
//! StorageRoot::parse("./data")           -> LocalStorage
//! ```
//!
//! ## Semantics shared by both adapters
//!
//! - `save` creates intermediate structure and overwrites existing content.
//! - `load` fails with [`StorageError::NotFound`] for a missing location.
//! - `exists` returns `Ok(false)` for a missing location.
//! - `delete` is idempotent and shallow: a directory loses its immediate
//!   children and then itself, nested directories are not recursed into.
//! - `list_files` returns immediate child names, empty for a missing path.
//!
//! Relative paths are trusted input; `..` segments are not sanitized.

use std::{
    fmt::{self, Display},
    path::PathBuf,
    sync::Arc,
};

use async_trait::async_trait;

use crate::{config::S3Settings, error::StorageError};

pub mod local;
pub mod s3;

pub use local::LocalStorage;
pub use s3::S3Storage;

/// The base location every relative path is resolved against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageRoot {
    Local(PathBuf),
    S3 { bucket: String, prefix: String },
}

/// A fully resolved location on one of the backends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Object { bucket: String, key: String },
}

impl Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Local(path) => write!(f, "{}", path.display()),
            Location::Object { bucket, key } => write!(f, "s3://{}/{}", bucket, key),
        }
    }
}

impl Display for StorageRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageRoot::Local(path) => write!(f, "{}", path.display()),
            StorageRoot::S3 { bucket, prefix } if prefix.is_empty() => {
                write!(f, "s3://{}", bucket)
            }
            StorageRoot::S3 { bucket, prefix } => write!(f, "s3://{}/{}", bucket, prefix),
        }
    }
}

impl StorageRoot {
    /// Parses a root locator.
    ///
    /// `s3://bucket[/prefix]` selects the object store, `file://path` or a
    /// plain path selects the local filesystem. Any other scheme is rejected.
    pub fn parse(locator: &str) -> Result<Self, StorageError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(StorageError::UnsupportedRoot(locator.to_string()));
        }

        match locator.split_once("://") {
            Some(("s3", rest)) => {
                let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
                if bucket.is_empty() {
                    return Err(StorageError::UnsupportedRoot(locator.to_string()));
                }
                Ok(StorageRoot::S3 {
                    bucket: bucket.to_string(),
                    prefix: prefix.trim_matches('/').to_string(),
                })
            }
            Some(("file", path)) if !path.is_empty() => Ok(StorageRoot::Local(PathBuf::from(path))),
            Some(_) => Err(StorageError::UnsupportedRoot(locator.to_string())),
            None => Ok(StorageRoot::Local(PathBuf::from(locator))),
        }
    }

    /// Joins `relative` onto the root without touching any backend.
    pub fn resolve(&self, relative: &str) -> Location {
        match self {
            StorageRoot::Local(base) => Location::Local(base.join(relative)),
            StorageRoot::S3 { bucket, prefix } => Location::Object {
                bucket: bucket.clone(),
                key: join_key(prefix, relative),
            },
        }
    }
}

/// Joins two object-key fragments with exactly one `/` between them.
pub(crate) fn join_key(prefix: &str, relative: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let relative = relative.trim_start_matches('/');
    match (prefix.is_empty(), relative.is_empty()) {
        (true, _) => relative.to_string(),
        (false, true) => prefix.to_string(),
        (false, false) => format!("{}/{}", prefix, relative),
    }
}

/// Uniform operations over a storage root.
///
/// Calls are awaited one at a time by their callers; implementations do not
/// batch or pipeline backend requests.
#[async_trait]
pub trait Storage: Send + Sync {
    fn root(&self) -> &StorageRoot;

    fn resolve(&self, relative_path: &str) -> Location {
        self.root().resolve(relative_path)
    }

    /// Writes `data` at `relative_path`, replacing existing content.
    async fn save(&self, relative_path: &str, data: &[u8]) -> Result<(), StorageError>;

    async fn load(&self, relative_path: &str) -> Result<Vec<u8>, StorageError>;

    async fn exists(&self, relative_path: &str) -> Result<bool, StorageError>;

    async fn delete(&self, relative_path: &str) -> Result<(), StorageError>;

    async fn list_files(&self, relative_path: &str) -> Result<Vec<String>, StorageError>;
}

/// Opens the adapter matching `root`.
pub async fn open(root: StorageRoot, s3: &S3Settings) -> Result<Arc<dyn Storage>, StorageError> {
    match root {
        StorageRoot::Local(base) => Ok(Arc::new(LocalStorage::new(base))),
        StorageRoot::S3 { bucket, prefix } => {
            Ok(Arc::new(S3Storage::connect(bucket, prefix, s3).await))
        }
    }
}

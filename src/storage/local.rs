use std::{io, path::PathBuf};

use async_fs::DirEntry;
use async_trait::async_trait;
use futures::TryStreamExt;
use tracing::{debug, instrument};

use super::{Storage, StorageRoot};
use crate::error::StorageError;

/// Storage rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: StorageRoot,
    base: PathBuf,
}

impl LocalStorage {
    /// Creates storage rooted at `base`.
    ///
    /// # Arguments
    ///
    /// * `base` - Directory every relative path is resolved against. It does
    ///   not need to exist yet; `save` creates it on first write.
    ///
    /// # Example
    ///
    /// ```
    /// let storage = LocalStorage::new("./data");
    /// storage.save("raw/playlists.json", b"{}").await?;
    /// ```
    pub fn new(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            root: StorageRoot::Local(base.clone()),
            base,
        }
    }

    /// The directory this storage is rooted at.
    pub fn base(&self) -> &PathBuf {
        &self.base
    }

    fn path(&self, relative_path: &str) -> PathBuf {
        self.base.join(relative_path)
    }
}

async fn entries(path: &PathBuf) -> io::Result<Vec<DirEntry>> {
    async_fs::read_dir(path).await?.try_collect().await
}

#[async_trait]
impl Storage for LocalStorage {
    fn root(&self) -> &StorageRoot {
        &self.root
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn save(&self, relative_path: &str, data: &[u8]) -> Result<(), StorageError> {
        let path = self.path(relative_path);
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent.display(), e))?;
        }

        async_fs::write(&path, data)
            .await
            .map_err(|e| StorageError::io(path.display(), e))?;
        debug!("Wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path(relative_path);
        async_fs::read(&path)
            .await
            .map_err(|e| StorageError::io(path.display(), e))
    }

    async fn exists(&self, relative_path: &str) -> Result<bool, StorageError> {
        let path = self.path(relative_path);
        match async_fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(path.display(), e)),
        }
    }

    /// Removes a file, or a directory together with its immediate children.
    ///
    /// Child directories are only removed when they are empty. The children
    /// are checked before anything is removed, so a non-empty child directory
    /// fails the call with [`StorageError::DirectoryNotEmpty`] and leaves the
    /// whole directory untouched.
    #[instrument(skip(self))]
    async fn delete(&self, relative_path: &str) -> Result<(), StorageError> {
        let path = self.path(relative_path);
        let meta = match async_fs::symlink_metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::io(path.display(), e)),
        };

        if !meta.is_dir() {
            debug!("Removing file {}", path.display());
            return async_fs::remove_file(&path)
                .await
                .map_err(|e| StorageError::io(path.display(), e));
        }

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        for child in entries(&path)
            .await
            .map_err(|e| StorageError::io(path.display(), e))?
        {
            let child_path = child.path();
            let file_type = child
                .file_type()
                .await
                .map_err(|e| StorageError::io(child_path.display(), e))?;
            if !file_type.is_dir() {
                files.push(child_path);
                continue;
            }

            let nested = entries(&child_path)
                .await
                .map_err(|e| StorageError::io(child_path.display(), e))?;
            if !nested.is_empty() {
                return Err(StorageError::DirectoryNotEmpty {
                    location: child_path.display().to_string(),
                });
            }
            dirs.push(child_path);
        }

        for file in &files {
            async_fs::remove_file(file)
                .await
                .map_err(|e| StorageError::io(file.display(), e))?;
        }
        for dir in &dirs {
            async_fs::remove_dir(dir)
                .await
                .map_err(|e| StorageError::io(dir.display(), e))?;
        }

        debug!(
            "Removing directory {} ({} files, {} empty directories)",
            path.display(),
            files.len(),
            dirs.len()
        );
        async_fs::remove_dir(&path)
            .await
            .map_err(|e| StorageError::io(path.display(), e))
    }

    async fn list_files(&self, relative_path: &str) -> Result<Vec<String>, StorageError> {
        let path = self.path(relative_path);
        match entries(&path).await {
            Ok(children) => Ok(children
                .iter()
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StorageError::io(path.display(), e)),
        }
    }
}

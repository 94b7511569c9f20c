use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{Client, config::Region, primitives::ByteStream};
use tracing::{debug, info, instrument};

use super::{Storage, StorageRoot, join_key};
use crate::{config::S3Settings, error::StorageError};

/// Storage rooted at a bucket prefix on an S3-compatible object store.
///
/// Directories are key prefixes ending in `/`. `save` needs no directory
/// creation since prefixes exist implicitly.
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    root: StorageRoot,
    bucket: String,
    prefix: String,
}

/// Immediate entries of a prefix listing.
#[derive(Debug, Default)]
struct Listing {
    /// Full keys of objects directly under the prefix.
    objects: Vec<String>,
    /// Child prefixes, including the trailing `/`.
    prefixes: Vec<String>,
}

impl S3Storage {
    /// Builds a client from the AWS provider chain plus `settings` overrides.
    pub async fn connect(bucket: String, prefix: String, settings: &S3Settings) -> Self {
        let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let mut builder =
            aws_sdk_s3::config::Builder::from(&shared).force_path_style(settings.path_style);

        if let Some(region) = &settings.region {
            builder = builder.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());
        info!("Object store client initialized for s3://{}/{}", bucket, prefix);
        Self::with_client(client, bucket, prefix)
    }

    /// Wraps an already configured client.
    ///
    /// # Arguments
    ///
    /// * `client` - S3 client used for every request
    /// * `bucket` - Bucket holding the storage root
    /// * `prefix` - Key prefix of the root inside the bucket, may be empty;
    ///   surrounding `/` are ignored
    pub fn with_client(client: Client, bucket: String, prefix: String) -> Self {
        let prefix = prefix.trim_matches('/').to_string();
        Self {
            client,
            root: StorageRoot::S3 {
                bucket: bucket.clone(),
                prefix: prefix.clone(),
            },
            bucket,
            prefix,
        }
    }

    fn key(&self, relative_path: &str) -> String {
        join_key(&self.prefix, relative_path)
    }

    fn location(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    async fn object_exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|se| se.is_not_found()) {
                    Ok(false)
                } else {
                    Err(StorageError::backend(self.location(key), e))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        debug!("Deleting {}", self.location(key));
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::backend(self.location(key), e))?;
        Ok(())
    }

    /// Lists one delimiter level under `dir`, following continuation tokens.
    async fn list_level(&self, dir: &str) -> Result<Listing, StorageError> {
        let mut listing = Listing::default();
        let mut token: Option<String> = None;

        loop {
            let response = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(dir)
                .delimiter("/")
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| StorageError::backend(self.location(dir), e))?;

            listing.objects.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );
            listing.prefixes.extend(
                response
                    .common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix().map(str::to_string)),
            );

            match response.next_continuation_token() {
                Some(next) if response.is_truncated().unwrap_or(false) => {
                    token = Some(next.to_string())
                }
                _ => break,
            }
        }

        Ok(listing)
    }

    async fn has_children(&self, dir: &str) -> Result<bool, StorageError> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(dir)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| StorageError::backend(self.location(dir), e))?;
        Ok(!response.contents().is_empty())
    }
}

/// The prefix that holds the children of `key`.
fn dir_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{}/", key)
    }
}

/// Name of `entry` relative to `dir`, without a trailing `/`.
/// Returns `None` for the directory marker itself.
fn child_name(dir: &str, entry: &str) -> Option<String> {
    let name = entry.strip_prefix(dir)?.trim_end_matches('/');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[async_trait]
impl Storage for S3Storage {
    fn root(&self) -> &StorageRoot {
        &self.root
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn save(&self, relative_path: &str, data: &[u8]) -> Result<(), StorageError> {
        let key = self.key(relative_path);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(data.to_vec()))
            .send()
            .await
            .map_err(|e| StorageError::backend(self.location(&key), e))?;
        debug!("Uploaded {} bytes to {}", data.len(), self.location(&key));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, relative_path: &str) -> Result<Vec<u8>, StorageError> {
        let key = self.key(relative_path);
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                    StorageError::NotFound {
                        location: self.location(&key),
                    }
                } else {
                    StorageError::backend(self.location(&key), e)
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::backend(self.location(&key), e))?
            .into_bytes()
            .to_vec();
        Ok(data)
    }

    async fn exists(&self, relative_path: &str) -> Result<bool, StorageError> {
        let key = self.key(relative_path);
        if !key.is_empty() && self.object_exists(&key).await? {
            return Ok(true);
        }
        self.has_children(&dir_prefix(&key)).await
    }

    /// Deletes the object at the key, or the objects one level under it.
    ///
    /// A child prefix counts as an empty directory when it only holds its own
    /// `sub/` marker; the marker is then deleted too. Any other child prefix
    /// fails the call with [`StorageError::DirectoryNotEmpty`] before anything
    /// is deleted.
    #[instrument(skip(self))]
    async fn delete(&self, relative_path: &str) -> Result<(), StorageError> {
        let key = self.key(relative_path);
        if !key.is_empty() && self.object_exists(&key).await? {
            return self.delete_object(&key).await;
        }

        let dir = dir_prefix(&key);
        let listing = self.list_level(&dir).await?;
        let mut doomed: Vec<String> = listing
            .objects
            .into_iter()
            .filter(|object| *object != dir)
            .collect();

        for child in &listing.prefixes {
            let nested = self.list_level(child).await?;
            if !nested.prefixes.is_empty() || nested.objects.iter().any(|o| o != child) {
                return Err(StorageError::DirectoryNotEmpty {
                    location: self.location(child),
                });
            }
            doomed.extend(nested.objects);
        }

        for object in &doomed {
            self.delete_object(object).await?;
        }
        if !dir.is_empty() {
            // Removes an explicit directory marker; absent keys are a no-op.
            self.delete_object(&dir).await?;
        }
        Ok(())
    }

    async fn list_files(&self, relative_path: &str) -> Result<Vec<String>, StorageError> {
        let dir = dir_prefix(&self.key(relative_path));
        let listing = self.list_level(&dir).await?;
        Ok(listing
            .objects
            .iter()
            .chain(listing.prefixes.iter())
            .filter_map(|entry| child_name(&dir, entry))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_storage(prefix: &str) -> S3Storage {
        let config = aws_sdk_s3::Config::builder()
            .region(Region::new("us-east-1"))
            .build();
        S3Storage::with_client(
            Client::from_conf(config),
            "lake".to_string(),
            prefix.to_string(),
        )
    }

    #[test]
    fn keys_are_joined_onto_the_prefix() {
        let storage = offline_storage("/music/");
        assert_eq!(storage.key("raw/playlists.json"), "music/raw/playlists.json");
        assert_eq!(
            storage.resolve("raw/playlists.json").to_string(),
            "s3://lake/music/raw/playlists.json"
        );

        let bare = offline_storage("");
        assert_eq!(bare.key("raw"), "raw");
    }

    #[test]
    fn dir_prefix_appends_one_slash() {
        assert_eq!(dir_prefix("raw/playlists"), "raw/playlists/");
        assert_eq!(dir_prefix("raw/"), "raw/");
        assert_eq!(dir_prefix(""), "");
    }

    #[test]
    fn child_names_are_relative_to_the_directory() {
        assert_eq!(
            child_name("raw/", "raw/a.txt"),
            Some("a.txt".to_string())
        );
        assert_eq!(child_name("raw/", "raw/sub/"), Some("sub".to_string()));
        assert_eq!(child_name("raw/", "raw/"), None);
        assert_eq!(child_name("raw/", "other/a.txt"), None);
    }
}

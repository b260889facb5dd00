use std::sync::Arc;
use std::time::Instant;
use bytes::Bytes;
use uuid::Uuid;

use crate::config::PhotoConfig;
use crate::error::{PhotoError, Result};
use crate::storage::{PublicAccess, StorageBackend};
use crate::utils;

/// An uploaded photo awaiting storage.
#[derive(Debug, Clone)]
pub struct PhotoPayload {
    /// The name of the file as given by the uploader.
    pub file_name: String,

    /// The declared MIME type of the photo.
    pub content_type: Option<String>,

    pub data: Bytes,
}

impl PhotoPayload {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn content_type(&self) -> String {
        self.content_type
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| mime::APPLICATION_OCTET_STREAM.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UploadedPhoto {
    /// The public URL of the photo, this is also used to delete it.
    pub url: String,
    pub blob_name: String,
    pub container: String,
    pub size: usize,

    /// The crc32 checksum of the stored bytes.
    pub checksum: u32,

    /// If this upload created the category's container.
    pub container_created: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Deletion {
    /// No URL was given so there was nothing to remove.
    NothingToDelete,

    Deleted {
        /// If the category's container was removed after its last photo went.
        container_removed: bool,
    },
}

/// Stores and removes photos, one container per category.
pub struct PhotoFacade {
    config: Arc<PhotoConfig>,
    storage: Arc<dyn StorageBackend>,
}

impl PhotoFacade {
    pub fn new(config: Arc<PhotoConfig>, storage: Arc<dyn StorageBackend>) -> Self {
        Self { config, storage }
    }

    pub async fn upload(&self, category: &str, payload: Option<PhotoPayload>) -> Result<UploadedPhoto> {
        let payload = match payload {
            Some(payload) if !payload.is_empty() => payload,
            _ => return Err(PhotoError::NoInput),
        };

        if let Some(limit) = self.config.max_upload_size {
            if payload.data.len() > limit {
                return Err(PhotoError::TooLarge {
                    size: payload.data.len(),
                    limit,
                });
            }
        }

        let container = utils::normalize_category(category).ok_or(PhotoError::EmptyCategory)?;
        self.store(container, payload)
            .await
            .map_err(|e| {
                error!("Failed to upload photo to category {:?}: {:?}", category, &e);
                PhotoError::Backend(e)
            })
    }

    async fn store(&self, container: String, payload: PhotoPayload) -> anyhow::Result<UploadedPhoto> {
        let start = Instant::now();

        let container_created = self.storage
            .create_container_if_not_exists(&container, PublicAccess::Blob)
            .await?;
        if container_created {
            info!("Created public container {}", &container);
        }

        let blob_name = format!(
            "{}{}{}",
            self.config.blob_prefix,
            Uuid::new_v4(),
            utils::file_extension(&payload.file_name),
        );

        let size = payload.data.len();
        let checksum = crc32fast::hash(&payload.data);
        let content_type = payload.content_type();
        self.storage
            .put_blob(&container, &blob_name, &content_type, payload.data)
            .await?;

        let url = self.storage.blob_url(&container, &blob_name)?;
        info!(
            "Stored {} byte {} photo @ {} in {:?}",
            size, content_type, &url, start.elapsed(),
        );

        Ok(UploadedPhoto {
            url,
            blob_name,
            container,
            size,
            checksum,
            container_created,
        })
    }

    pub async fn delete(&self, category: &str, url: &str) -> Result<Deletion> {
        let url = url.trim();
        if url.is_empty() {
            return Ok(Deletion::NothingToDelete);
        }

        let container = utils::normalize_category(category).ok_or(PhotoError::EmptyCategory)?;
        let blob = utils::blob_name_from_url(url);
        if blob.is_empty() {
            return Err(PhotoError::NotFound {
                container,
                blob: blob.to_string(),
            });
        }

        let deleted = self.storage
            .delete_blob_if_exists(&container, blob)
            .await
            .map_err(|e| {
                error!("Failed to delete photo {} from {}: {:?}", blob, &container, &e);
                PhotoError::Backend(e)
            })?;

        if !deleted {
            return Err(PhotoError::NotFound {
                container,
                blob: blob.to_string(),
            });
        }

        debug!("Deleted photo {} from {}", blob, &container);
        let container_removed = self.cleanup_container(&container).await;

        Ok(Deletion::Deleted { container_removed })
    }

    /// Removes the container if it has become empty.
    ///
    /// Failures are logged only, the photo itself is already gone.
    async fn cleanup_container(&self, container: &str) -> bool {
        if !self.config.remove_empty_containers {
            return false;
        }

        match self.storage.delete_container_if_empty(container).await {
            Ok(true) => {
                info!("Removed empty container {}", container);
                true
            },
            Ok(false) => false,
            Err(e) => {
                error!("Failed to clean up container {}: {:?}", container, e);
                false
            },
        }
    }

    /// The public URLs of every photo in the category, ordered by blob name.
    pub async fn list(&self, category: &str) -> Result<Vec<String>> {
        let container = utils::normalize_category(category).ok_or(PhotoError::EmptyCategory)?;

        let mut blobs = self.storage
            .list_blobs(&container)
            .await
            .map_err(|e| {
                error!("Failed to list photos in {}: {:?}", &container, &e);
                PhotoError::Backend(e)
            })?;
        blobs.sort();

        blobs
            .iter()
            .map(|blob| self.storage.blob_url(&container, blob))
            .collect::<anyhow::Result<Vec<_>>>()
            .map_err(|e| {
                error!("Failed to resolve photo URLs in {}: {:?}", &container, &e);
                PhotoError::Backend(e)
            })
    }
}

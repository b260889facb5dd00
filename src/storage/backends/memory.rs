use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::storage::template::join_url;
use crate::storage::{PublicAccess, StorageBackend};

#[derive(Debug, Clone)]
pub struct StoredBlob {
    pub content_type: String,
    pub data: Bytes,
}

struct Container {
    access: PublicAccess,
    blobs: HashMap<String, StoredBlob>,
}

pub struct MemoryBackend {
    public_url: String,
    containers: RwLock<HashMap<String, Container>>,
}

impl MemoryBackend {
    pub fn new(public_url: String) -> Self {
        Self {
            public_url,
            containers: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn blob(&self, container: &str, blob: &str) -> Option<StoredBlob> {
        self.containers
            .read()
            .get(container)
            .and_then(|c| c.blobs.get(blob).cloned())
    }

    #[cfg(test)]
    pub fn container_access(&self, container: &str) -> Option<PublicAccess> {
        self.containers.read().get(container).map(|c| c.access)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: PublicAccess,
    ) -> anyhow::Result<bool> {
        let mut containers = self.containers.write();
        if containers.contains_key(container) {
            return Ok(false);
        }

        debug!("Creating in-memory container {} with {:?} access", container, access);
        containers.insert(
            container.to_string(),
            Container {
                access,
                blobs: HashMap::new(),
            },
        );

        Ok(true)
    }

    async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        content_type: &str,
        data: Bytes,
    ) -> anyhow::Result<()> {
        let mut containers = self.containers.write();
        let target = containers
            .get_mut(container)
            .ok_or_else(|| anyhow!("Container {} does not exist.", container))?;

        debug!("Storing blob {}/{} ({} bytes)", container, blob, data.len());
        target.blobs.insert(
            blob.to_string(),
            StoredBlob {
                content_type: content_type.to_string(),
                data,
            },
        );

        Ok(())
    }

    fn blob_url(&self, container: &str, blob: &str) -> anyhow::Result<String> {
        Ok(join_url(&self.public_url, container, blob))
    }

    async fn delete_blob_if_exists(&self, container: &str, blob: &str) -> anyhow::Result<bool> {
        let mut containers = self.containers.write();
        let removed = containers
            .get_mut(container)
            .map(|c| c.blobs.remove(blob).is_some())
            .unwrap_or(false);

        debug!("Purging blob {}/{} (existed: {})", container, blob, removed);
        Ok(removed)
    }

    async fn list_blobs(&self, container: &str) -> anyhow::Result<Vec<String>> {
        let containers = self.containers.read();
        let names = containers
            .get(container)
            .map(|c| c.blobs.keys().cloned().collect())
            .unwrap_or_default();

        Ok(names)
    }

    async fn delete_container_if_empty(&self, container: &str) -> anyhow::Result<bool> {
        let mut containers = self.containers.write();
        match containers.get(container) {
            Some(c) if c.blobs.is_empty() => {
                containers.remove(container);
                Ok(true)
            },
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_container_creation_is_idempotent() -> anyhow::Result<()> {
        let backend = MemoryBackend::new("http://localhost/photos".into());

        assert!(backend.create_container_if_not_exists("shoes", PublicAccess::Blob).await?);
        assert!(!backend.create_container_if_not_exists("shoes", PublicAccess::None).await?);
        assert_eq!(backend.container_access("shoes"), Some(PublicAccess::Blob));

        Ok(())
    }

    #[tokio::test]
    async fn test_put_requires_container() {
        let backend = MemoryBackend::new("http://localhost/photos".into());
        let res = backend
            .put_blob("missing", "a.png", "image/png", Bytes::from_static(b"abc"))
            .await;

        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_non_empty_container_is_kept() -> anyhow::Result<()> {
        let backend = MemoryBackend::new("http://localhost/photos/".into());
        backend.create_container_if_not_exists("hats", PublicAccess::Blob).await?;
        backend.put_blob("hats", "a.png", "image/png", Bytes::from_static(b"abc")).await?;

        assert_eq!(
            backend.blob_url("hats", "a.png")?,
            "http://localhost/photos/hats/a.png",
        );
        assert!(!backend.delete_container_if_empty("hats").await?);
        assert!(backend.delete_blob_if_exists("hats", "a.png").await?);
        assert!(!backend.delete_blob_if_exists("hats", "a.png").await?);
        assert!(backend.delete_container_if_empty("hats").await?);
        assert!(backend.list_blobs("hats").await?.is_empty());

        Ok(())
    }
}

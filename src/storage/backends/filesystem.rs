use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use bytes::Bytes;

use crate::storage::template::join_url;
use crate::storage::{PublicAccess, StorageBackend};

pub struct FileSystemBackend {
    directory: PathBuf,
    public_url: String,
}

impl FileSystemBackend {
    pub fn new(dir: PathBuf, public_url: String) -> Self {
        Self {
            directory: dir,
            public_url,
        }
    }

    pub async fn ensure_root(&self) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .with_context(|| format!("Failed to create storage directory {:?}", &self.directory))
    }

    /// Containers and blobs must map onto exactly one path component.
    #[inline]
    fn checked_component(name: &str) -> anyhow::Result<&str> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) if !name.contains(|c: char| c == '/' || c == '\\') => {
                Ok(name)
            },
            _ => Err(anyhow!("{:?} is not a valid file system name.", name)),
        }
    }

    #[inline]
    fn container_path(&self, container: &str) -> anyhow::Result<PathBuf> {
        Ok(self.directory.join(Self::checked_component(container)?))
    }

    #[inline]
    fn blob_path(&self, container: &str, blob: &str) -> anyhow::Result<PathBuf> {
        Ok(self.container_path(container)?.join(Self::checked_component(blob)?))
    }
}

async fn has_entries(path: &Path) -> anyhow::Result<bool> {
    let mut entries = tokio::fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_some())
}

#[async_trait]
impl StorageBackend for FileSystemBackend {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: PublicAccess,
    ) -> anyhow::Result<bool> {
        let path = self.container_path(container)?;

        match tokio::fs::create_dir(&path).await {
            Ok(()) => {
                debug!(
                    "Created container @ {:?}, {:?} access is left to the server of {}",
                    &path, access, &self.public_url,
                );
                Ok(true)
            },
            Err(ref e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        content_type: &str,
        data: Bytes,
    ) -> anyhow::Result<()> {
        let path = self.blob_path(container, blob)?;

        debug!("Storing {} blob @ {:?}", content_type, &path);
        match tokio::fs::write(&path, &data).await {
            Ok(()) => Ok(()),
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                Err(anyhow!("Container {} does not exist.", container))
            },
            Err(other) => Err(other.into()),
        }
    }

    fn blob_url(&self, container: &str, blob: &str) -> anyhow::Result<String> {
        Ok(join_url(&self.public_url, container, blob))
    }

    async fn delete_blob_if_exists(&self, container: &str, blob: &str) -> anyhow::Result<bool> {
        let path = self.blob_path(container, blob)?;

        debug!("Purging blob @ {:?}", &path);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    async fn list_blobs(&self, container: &str) -> anyhow::Result<Vec<String>> {
        let path = self.container_path(container)?;

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(ref e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(other) => return Err(other.into()),
        };

        let mut names = vec![];
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }

        Ok(names)
    }

    async fn delete_container_if_empty(&self, container: &str) -> anyhow::Result<bool> {
        let path = self.container_path(container)?;

        // `remove_dir` refuses non-empty directories.
        match tokio::fs::remove_dir(&path).await {
            Ok(()) => Ok(true),
            Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(other) => {
                if has_entries(&path).await? {
                    Ok(false)
                } else {
                    Err(other.into())
                }
            },
        }
    }
}

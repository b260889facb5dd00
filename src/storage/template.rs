use async_trait::async_trait;
use bytes::Bytes;

/// The anonymous access level applied to a newly created container.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PublicAccess {
    /// No anonymous access.
    None,

    /// Anonymous read access to individual blobs, without
    /// being able to list the container.
    Blob,
}

#[async_trait]
pub trait StorageBackend: Sync + Send + 'static {
    /// Creates the container if it does not already exist, applying the
    /// given access level to it.
    ///
    /// Returns `true` if the container was created by this call.
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: PublicAccess,
    ) -> anyhow::Result<bool>;

    /// Writes a blob into an existing container, replacing any blob
    /// with the same name.
    async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        content_type: &str,
        data: Bytes,
    ) -> anyhow::Result<()>;

    /// The absolute public URL of the given blob.
    fn blob_url(&self, container: &str, blob: &str) -> anyhow::Result<String>;

    /// Returns `true` if the blob existed and was deleted.
    async fn delete_blob_if_exists(&self, container: &str, blob: &str) -> anyhow::Result<bool>;

    /// The names of all blobs within the container, a missing container
    /// is treated as empty.
    async fn list_blobs(&self, container: &str) -> anyhow::Result<Vec<String>>;

    /// Deletes the container only if it holds no blobs.
    ///
    /// The emptiness check and the removal must happen as one operation on
    /// the backend so a concurrent upload is never lost.
    async fn delete_container_if_empty(&self, container: &str) -> anyhow::Result<bool>;
}

pub(crate) fn join_url(base: &str, container: &str, blob: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), container, blob)
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use serde::Deserialize;

use crate::storage::StorageBackend;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendConfigs {
    /// Keeps every container in process memory.
    ///
    /// Nothing survives a restart, mostly useful for development and tests.
    Memory {
        /// The base URL blob URLs are built from.
        public_url: String,
    },

    FileSystem {
        /// The directory containers are created in.
        directory: PathBuf,

        /// The base URL the directory is publicly served at.
        public_url: String,
    },

    /// Any S3 compatible blob storage service.
    ///
    /// Each container is stored as its own storage bucket.
    BlobStorage {
        region: String,
        endpoint: String,
        access_key: Option<String>,
        secret_key: Option<String>,
        security_token: Option<String>,
        session_token: Option<String>,

        #[serde(default)]
        /// Address buckets as `endpoint/bucket` rather than `bucket.endpoint`.
        path_style: bool,

        /// The request timeout in seconds.
        request_timeout: Option<u64>,
    },
}

impl BackendConfigs {
    pub async fn connect(&self) -> anyhow::Result<Arc<dyn StorageBackend>> {
        match self {
            Self::Memory { public_url } => {
                Ok(Arc::new(super::memory::MemoryBackend::new(public_url.clone())))
            },
            Self::FileSystem { directory, public_url } => {
                let backend = super::filesystem::FileSystemBackend::new(
                    directory.clone(),
                    public_url.clone(),
                );
                backend.ensure_root().await?;
                Ok(Arc::new(backend))
            },
            Self::BlobStorage {
                region,
                endpoint,
                access_key,
                secret_key,
                security_token,
                session_token,
                path_style,
                request_timeout,
            } => {
                let backend = super::blob_storage::BlobStorageBackend::new(
                    region.clone(),
                    endpoint.clone(),
                    access_key.as_deref(),
                    secret_key.as_deref(),
                    security_token.as_deref(),
                    session_token.as_deref(),
                    *path_style,
                    request_timeout.map(Duration::from_secs),
                )?;
                Ok(Arc::new(backend))
            },
        }
    }
}

use std::time::Duration;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use s3::creds::Credentials;
use s3::{Bucket, BucketConfiguration, Region};

use crate::storage::{PublicAccess, StorageBackend};

/// Stores every container as its own bucket of an S3 compatible service.
pub struct BlobStorageBackend {
    region: Region,
    credentials: Credentials,
    path_style: bool,
    request_timeout: Option<Duration>,
}

impl BlobStorageBackend {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        region: String,
        endpoint: String,
        access_key: Option<&str>,
        secret_key: Option<&str>,
        security_token: Option<&str>,
        session_token: Option<&str>,
        path_style: bool,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let credentials = Credentials::new(access_key, secret_key, security_token, session_token, None)?;
        let region = Region::Custom { region, endpoint };

        Ok(Self {
            region,
            credentials,
            path_style,
            request_timeout,
        })
    }

    fn bucket(&self, container: &str) -> Result<Bucket> {
        let mut bucket = Bucket::new(container, self.region.clone(), self.credentials.clone())?;
        if self.path_style {
            bucket = bucket.with_path_style();
        }
        bucket.set_request_timeout(self.request_timeout);

        Ok(bucket)
    }

    fn bucket_config(access: PublicAccess) -> BucketConfiguration {
        match access {
            PublicAccess::None => BucketConfiguration::private(),
            PublicAccess::Blob => BucketConfiguration::public(),
        }
    }
}

fn unexpected_status(code: u16) -> anyhow::Error {
    anyhow!("Remote storage bucket did not respond correctly, got status {}", code)
}

#[async_trait]
impl StorageBackend for BlobStorageBackend {
    async fn create_container_if_not_exists(
        &self,
        container: &str,
        access: PublicAccess,
    ) -> Result<bool> {
        debug!("Creating storage bucket {} with {:?} access", container, access);
        let config = Self::bucket_config(access);
        let response = if self.path_style {
            Bucket::create_with_path_style(
                container,
                self.region.clone(),
                self.credentials.clone(),
                config,
            ).await?
        } else {
            Bucket::create(container, self.region.clone(), self.credentials.clone(), config).await?
        };

        match response.response_code {
            200..=299 => Ok(true),
            // BucketAlreadyOwnedByYou / BucketAlreadyExists
            409 => Ok(false),
            code => Err(unexpected_status(code)),
        }
    }

    async fn put_blob(
        &self,
        container: &str,
        blob: &str,
        content_type: &str,
        data: Bytes,
    ) -> Result<()> {
        let bucket = self.bucket(container)?;

        debug!("Storing blob in bucket @ {}/{}", container, blob);
        let response = bucket.put_object_with_content_type(blob, &data, content_type).await?;
        match response.status_code() {
            200..=299 => Ok(()),
            code => Err(unexpected_status(code)),
        }
    }

    fn blob_url(&self, container: &str, blob: &str) -> Result<String> {
        let bucket = self.bucket(container)?;
        Ok(format!("{}/{}", bucket.url(), blob))
    }

    async fn delete_blob_if_exists(&self, container: &str, blob: &str) -> Result<bool> {
        let bucket = self.bucket(container)?;

        let (_, code) = bucket.head_object(blob).await?;
        match code {
            200..=299 => {},
            404 => return Ok(false),
            code => return Err(unexpected_status(code)),
        }

        debug!("Purging blob in bucket @ {}/{}", container, blob);
        let response = bucket.delete_object(blob).await?;
        match response.status_code() {
            200..=299 => Ok(true),
            404 => Ok(false),
            code => Err(unexpected_status(code)),
        }
    }

    async fn list_blobs(&self, container: &str) -> Result<Vec<String>> {
        let bucket = self.bucket(container)?;

        let pages = match bucket.list(String::new(), None).await {
            Ok(pages) => pages,
            Err(e) => {
                // A NoSuchBucket body fails to parse as a listing, the status of
                // a plain GET on the bucket tells the two apart.
                let response = bucket.get_object("/").await?;
                if response.status_code() == 404 {
                    return Ok(vec![]);
                }
                return Err(e.into());
            },
        };
        let names = pages
            .into_iter()
            .flat_map(|page| page.contents)
            .map(|object| object.key)
            .collect();

        Ok(names)
    }

    async fn delete_container_if_empty(&self, container: &str) -> Result<bool> {
        let bucket = self.bucket(container)?;

        // DeleteBucket refuses buckets which still hold objects.
        match bucket.delete().await? {
            200..=299 => Ok(true),
            404 | 409 => Ok(false),
            code => Err(unexpected_status(code)),
        }
    }
}

//! S3 backed archive download

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::errors::DeployerError;
use crate::filesys::file::File;
use crate::services::ObjectStore;

/// Object store over an S3 client
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn download(&self, bucket: &str, key: &str, dest: &File) -> Result<(), DeployerError> {
        debug!("GET s3://{}/{} -> {}", bucket, key, dest.path().display());

        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                DeployerError::StorageError(format!(
                    "s3://{}/{}: {}",
                    bucket,
                    key,
                    DisplayErrorContext(&e)
                ))
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| DeployerError::StorageError(format!("s3://{}/{}: {}", bucket, key, e)))?
            .into_bytes();

        dest.write_bytes(&bytes).await?;
        debug!("Downloaded {} bytes from s3://{}/{}", bytes.len(), bucket, key);
        Ok(())
    }
}

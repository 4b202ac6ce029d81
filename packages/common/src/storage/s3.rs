use async_trait::async_trait;
use s3::Bucket;
use s3::Region;
use s3::creds::Credentials;

use super::error::StorageError;
use super::key::BlobKey;
use super::traits::ObjectStore;
use crate::config::BackupConfig;

/// S3 (or S3-compatible) bucket used as the off-site backup target.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

impl S3ObjectStore {
    pub fn new(config: &BackupConfig) -> Result<Self, StorageError> {
        let region = if config.endpoint.trim().is_empty() {
            config
                .region
                .parse::<Region>()
                .map_err(|e| StorageError::Config(format!("invalid region: {e}")))?
        } else {
            Region::Custom {
                region: config.region.clone(),
                endpoint: config.endpoint.clone(),
            }
        };

        let credentials = Credentials::new(
            Some(&config.access_key_id),
            Some(&config.secret_access_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid credentials: {e}")))?;

        let bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        // Path-style addressing keeps self-hosted endpoints working.
        let bucket = if config.endpoint.trim().is_empty() {
            bucket
        } else {
            bucket.with_path_style()
        };

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &BlobKey, data: Vec<u8>) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object(key.as_str(), &data)
            .await
            .map_err(|e| StorageError::Remote(e.to_string()))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Remote(format!(
                "upload of {key} answered with status {status}"
            )));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3://{}", self.bucket.name())
    }
}

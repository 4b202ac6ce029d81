use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::error::StorageError;
use super::key::BlobKey;

/// Type alias for a boxed async reader.
pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Name-addressed blob storage for original photos and thumbnails.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, replacing any previous blob with that name.
    async fn put(&self, key: &BlobKey, data: &[u8]) -> Result<(), StorageError>;

    /// Retrieve all bytes for a blob.
    async fn get(&self, key: &BlobKey) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.get_stream(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Retrieve a blob as a streaming async reader.
    async fn get_stream(&self, key: &BlobKey) -> Result<BoxReader, StorageError>;

    /// Delete a blob.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError>;

    /// Get the size of a blob in bytes.
    async fn size(&self, key: &BlobKey) -> Result<u64, StorageError>;
}

/// Durable off-site storage that backups are mirrored into.
///
/// Objects are only ever added; the backup worker never reads or removes them.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `data` under `key`.
    async fn put_object(&self, key: &BlobKey, data: Vec<u8>) -> Result<(), StorageError>;

    /// Short description for log lines, e.g. `s3://bucket`.
    fn describe(&self) -> String;
}

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::BufReader;

use super::error::StorageError;
use super::key::BlobKey;
use super::traits::{BlobStore, BoxReader, ObjectStore};

/// Filesystem-backed blob store.
///
/// Blobs live at `{base_path}/{key}`, so `photos/ab.jpg` ends up in
/// `{base_path}/photos/ab.jpg`. Writes go through `{base_path}/.tmp` and are
/// renamed into place.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new filesystem blob store.
    pub async fn new(base_path: PathBuf) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self { base_path })
    }

    /// Compute the filesystem path for a given key.
    fn blob_path(&self, key: &BlobKey) -> PathBuf {
        key.segments()
            .fold(self.base_path.clone(), |path, segment| path.join(segment))
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_atomically(&self, key: &BlobKey, data: &[u8]) -> Result<(), StorageError> {
        let blob_path = self.blob_path(key);

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &blob_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &BlobKey, data: &[u8]) -> Result<(), StorageError> {
        self.write_atomically(key, data).await
    }

    async fn get_stream(&self, key: &BlobKey) -> Result<BoxReader, StorageError> {
        let blob_path = self.blob_path(key);
        match fs::File::open(&blob_path).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &BlobKey) -> Result<bool, StorageError> {
        let blob_path = self.blob_path(key);
        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn size(&self, key: &BlobKey) -> Result<u64, StorageError> {
        let blob_path = self.blob_path(key);
        match fs::metadata(&blob_path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// A local directory can stand in for the backup bucket.
#[async_trait]
impl ObjectStore for FilesystemBlobStore {
    async fn put_object(&self, key: &BlobKey, data: Vec<u8>) -> Result<(), StorageError> {
        self.write_atomically(key, &data).await
    }

    fn describe(&self) -> String {
        format!("file://{}", self.base_path.display())
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::error::StorageError;

/// Logical path of a stored blob, e.g. `photos/3fa9...c1.jpg`.
///
/// The same name is used locally and in the off-site backup bucket.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BlobKey(String);

impl BlobKey {
    /// Validate a logical path: relative, `/`-separated, no empty, `.` or `..`
    /// segments, no backslashes or control characters.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        if raw.is_empty() {
            return Err(StorageError::InvalidKey("key must not be empty".into()));
        }
        if raw.len() > 512 {
            return Err(StorageError::InvalidKey("key is too long".into()));
        }
        if raw.chars().any(|c| c.is_ascii_control() || c == '\\') {
            return Err(StorageError::InvalidKey(
                "key contains forbidden characters".into(),
            ));
        }
        if raw.starts_with('/') {
            return Err(StorageError::InvalidKey("key must be relative".into()));
        }
        for segment in raw.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(StorageError::InvalidKey(format!(
                    "invalid path segment in '{raw}'"
                )));
            }
        }
        Ok(Self(raw.to_string()))
    }

    /// Name a new upload under `prefix` from the SHA-256 of its bytes followed
    /// by `salt`, so re-uploading identical bytes yields a distinct name.
    pub fn derive(prefix: &str, data: &[u8], salt: &[u8], extension: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.update(salt);
        let hash = hex::encode(hasher.finalize());
        let extension = extension.trim_start_matches('.');
        if extension.is_empty() {
            Self(format!("{prefix}/{hash}"))
        } else {
            Self(format!("{prefix}/{hash}.{}", extension.to_ascii_lowercase()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Segments of the path, for building filesystem paths.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Final segment of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Debug for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobKey({})", self.0)
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for BlobKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for BlobKey {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

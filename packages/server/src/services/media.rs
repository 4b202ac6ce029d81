use std::io::Cursor;
use std::sync::Arc;

use chrono::Utc;
use common::BackupJob;
use common::storage::{BlobKey, BlobStore};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader};
use sea_orm::*;
use tracing::{info, instrument, warn};

use crate::backup::{BackupTrigger, fire_and_log};
use crate::config::MediaConfig;
use crate::entity::{file_backup, media_file};
use crate::error::AppError;
use crate::state::AppState;

/// Facts about an upload that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

fn unsupported() -> AppError {
    AppError::field("file", "Unsupported image format")
}

/// Check size, format and resolution without decoding pixel data.
pub fn inspect(config: &MediaConfig, data: &[u8]) -> Result<ImageInfo, AppError> {
    if data.len() as u64 > config.max_upload_size {
        return Err(AppError::field(
            "file",
            format!("Max size of file is {}B", config.max_upload_size),
        ));
    }

    let format = image::guess_format(data).map_err(|_| unsupported())?;
    let accepted = format.extensions_str().iter().any(|ext| {
        config
            .accepted_formats
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    });
    if !accepted {
        return Err(unsupported());
    }

    let (width, height) = ImageReader::with_format(Cursor::new(data), format)
        .into_dimensions()
        .map_err(|_| unsupported())?;
    if std::cmp::Ord::max(width, height) > config.max_upload_resolution {
        return Err(AppError::field(
            "file",
            format!("Max photo resolution is {}px", config.max_upload_resolution),
        ));
    }

    Ok(ImageInfo {
        format,
        width,
        height,
    })
}

/// Decode the upload and re-encode a bounded JPEG thumbnail.
pub fn make_thumbnail(
    data: &[u8],
    format: ImageFormat,
    size: u32,
    quality: u8,
) -> Result<Vec<u8>, AppError> {
    let img = image::load_from_memory_with_format(data, format).map_err(|_| unsupported())?;
    // Never upscale small photos.
    let rgb = if img.width() <= size && img.height() <= size {
        img.to_rgb8()
    } else {
        img.thumbnail(size, size).to_rgb8()
    };

    let mut out = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, quality))
        .map_err(|e| AppError::Internal(format!("thumbnail encoding failed: {e}")))?;
    Ok(out)
}

/// Stores validated photos with their thumbnails and schedules their backup.
#[derive(Clone)]
pub struct MediaIntake {
    db: DatabaseConnection,
    blobs: Arc<dyn BlobStore>,
    config: MediaConfig,
    trigger: Arc<dyn BackupTrigger>,
}

impl MediaIntake {
    pub fn new(
        db: DatabaseConnection,
        blobs: Arc<dyn BlobStore>,
        config: MediaConfig,
        trigger: Arc<dyn BackupTrigger>,
    ) -> Self {
        Self {
            db,
            blobs,
            config,
            trigger,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.db.clone(),
            state.blob_store.clone(),
            state.config.media.clone(),
            state.backup_trigger.clone(),
        )
    }

    /// Validate and persist an upload owned by `owner`.
    ///
    /// Nothing is written unless every check passes. The media row and its
    /// pending backup row commit together; the backup job is sent after the
    /// commit.
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn store(&self, owner: i32, data: Vec<u8>) -> Result<media_file::Model, AppError> {
        let info = inspect(&self.config, &data)?;

        let (size, quality) = (self.config.thumbnail_size, self.config.thumbnail_quality);
        let (data, thumb) = tokio::task::spawn_blocking(move || {
            let thumb = make_thumbnail(&data, info.format, size, quality);
            (data, thumb)
        })
        .await
        .map_err(|e| AppError::Internal(format!("thumbnail task failed: {e}")))?;
        let thumb = thumb?;

        let now = Utc::now();
        let salt = now.timestamp_nanos_opt().unwrap_or_default().to_le_bytes();
        let extension = info.format.extensions_str().first().copied().unwrap_or("");
        let file_key = BlobKey::derive("photos", &data, &salt, extension);
        let thumbnail_key = BlobKey::derive("thumbs", &data, &salt, "jpg");

        self.blobs.put(&file_key, &data).await?;
        if let Err(e) = self.blobs.put(&thumbnail_key, &thumb).await {
            self.discard(&[&file_key]).await;
            return Err(e.into());
        }

        let saved = self
            .insert_rows(owner, &file_key, &thumbnail_key, &info, data.len(), now)
            .await;
        let (media, backup) = match saved {
            Ok(rows) => rows,
            Err(e) => {
                self.discard(&[&file_key, &thumbnail_key]).await;
                return Err(e.into());
            }
        };

        info!(media_file_id = media.id, key = %file_key, "Stored media file");
        fire_and_log(self.trigger.as_ref(), BackupJob::single(backup.id)).await;
        Ok(media)
    }

    async fn insert_rows(
        &self,
        owner: i32,
        file_key: &BlobKey,
        thumbnail_key: &BlobKey,
        info: &ImageInfo,
        size: usize,
        now: chrono::DateTime<Utc>,
    ) -> Result<(media_file::Model, file_backup::Model), DbErr> {
        let txn = self.db.begin().await?;

        let media = media_file::ActiveModel {
            file_key: Set(file_key.to_string()),
            thumbnail_key: Set(thumbnail_key.to_string()),
            content_type: Set(info.format.to_mime_type().to_string()),
            size: Set(size as i64),
            width: Set(info.width as i32),
            height: Set(info.height as i32),
            user_id: Set(owner),
            submission_id: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let backup = file_backup::ActiveModel {
            media_file_id: Set(media.id),
            done: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok((media, backup))
    }

    async fn discard(&self, keys: &[&BlobKey]) {
        for key in keys {
            if let Err(e) = self.blobs.delete(key).await {
                warn!(key = %key, error = %e, "Failed to remove blob after aborted upload");
            }
        }
    }

    /// Delete an unlinked media file. Files inside a submission go away with
    /// the submission.
    #[instrument(skip(self, media), fields(media_file_id = media.id))]
    pub async fn delete(&self, media: media_file::Model) -> Result<(), AppError> {
        if media.submission_id.is_some() {
            return Err(AppError::Conflict(
                "Media file is part of a submission".into(),
            ));
        }

        let txn = self.db.begin().await?;
        delete_media_rows(&txn, vec![media.id]).await?;
        txn.commit().await?;

        remove_media_blobs(self.blobs.as_ref(), &[media]).await;
        Ok(())
    }
}

/// Delete media rows and their backup records. Blobs are left to
/// [`remove_media_blobs`] once the surrounding transaction commits.
pub async fn delete_media_rows<C: ConnectionTrait>(db: &C, ids: Vec<i32>) -> Result<(), DbErr> {
    if ids.is_empty() {
        return Ok(());
    }
    file_backup::Entity::delete_many()
        .filter(file_backup::Column::MediaFileId.is_in(ids.clone()))
        .exec(db)
        .await?;
    media_file::Entity::delete_many()
        .filter(media_file::Column::Id.is_in(ids))
        .exec(db)
        .await?;
    Ok(())
}

/// Best-effort removal of originals and thumbnails. Failures leave an orphan
/// blob behind and are only logged.
pub async fn remove_media_blobs(blobs: &dyn BlobStore, media: &[media_file::Model]) {
    for m in media {
        for raw in [&m.file_key, &m.thumbnail_key] {
            let result = match BlobKey::parse(raw) {
                Ok(key) => blobs.delete(&key).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(media_file_id = m.id, key = %raw, error = %e, "Failed to delete media blob");
            }
        }
    }
}

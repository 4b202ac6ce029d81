use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::config::BackupConfig;
use common::storage::filesystem::FilesystemBlobStore;
use common::storage::s3::S3ObjectStore;
use common::storage::{BlobKey, BlobStore, ObjectStore, StorageError};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::Query;
use sea_orm::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::entity::{file_backup, media_file};

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("database error: {0}")]
    Db(#[from] DbErr),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("upload failed: {0}")]
    Upload(String),
    #[error("upload timed out after {0}s")]
    Timeout(u64),
}

/// Outcome of one backup pass.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct BackupReport {
    /// Pending records picked up by this pass.
    pub processed: usize,
    pub succeeded: usize,
    /// Records left pending after a failed upload.
    pub failed: usize,
    /// Records created by reconciliation.
    pub created: usize,
}

/// Build the backup target: an S3 bucket when one is configured, otherwise
/// a local directory.
pub async fn object_store_from_config(
    config: &BackupConfig,
) -> Result<Arc<dyn ObjectStore>, StorageError> {
    if config.uses_bucket() {
        Ok(Arc::new(S3ObjectStore::new(config)?))
    } else {
        Ok(Arc::new(
            FilesystemBlobStore::new(PathBuf::from(&config.local_dir)).await?,
        ))
    }
}

/// Create pending backup rows for media files that have none.
pub async fn reconcile<C: ConnectionTrait>(db: &C) -> Result<usize, DbErr> {
    let missing: Vec<i32> = media_file::Entity::find()
        .select_only()
        .column(media_file::Column::Id)
        .filter(
            media_file::Column::Id.not_in_subquery(
                Query::select()
                    .column(file_backup::Column::MediaFileId)
                    .from(file_backup::Entity)
                    .to_owned(),
            ),
        )
        .into_tuple()
        .all(db)
        .await?;

    if missing.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let rows = missing.iter().map(|&media_file_id| file_backup::ActiveModel {
        media_file_id: Set(media_file_id),
        done: Set(None),
        created_at: Set(now),
        ..Default::default()
    });
    file_backup::Entity::insert_many(rows)
        .exec_without_returning(db)
        .await?;

    info!(created = missing.len(), "Created missing backup records");
    Ok(missing.len())
}

/// Uploads pending media files to the backup target.
#[derive(Clone)]
pub struct BackupRunner {
    db: DatabaseConnection,
    source: Arc<dyn BlobStore>,
    target: Arc<dyn ObjectStore>,
    upload_timeout: Duration,
}

impl BackupRunner {
    pub fn new(
        db: DatabaseConnection,
        source: Arc<dyn BlobStore>,
        target: Arc<dyn ObjectStore>,
        upload_timeout: Duration,
    ) -> Self {
        Self {
            db,
            source,
            target,
            upload_timeout,
        }
    }

    /// Back up one pending record, or with `None` reconcile and back up every
    /// pending record.
    ///
    /// Individual upload failures are logged and counted; the record stays
    /// pending for the next run. Only database errors while selecting work
    /// abort the pass.
    #[instrument(skip(self), fields(target = %self.target.describe()))]
    pub async fn process(&self, file_backup_id: Option<i32>) -> Result<BackupReport, BackupError> {
        let mut report = BackupReport::default();

        let records = match file_backup_id {
            Some(id) => file_backup::Entity::find_by_id(id).all(&self.db).await?,
            None => {
                report.created = reconcile(&self.db).await?;
                file_backup::Entity::find()
                    .filter(file_backup::Column::Done.is_null())
                    .order_by_asc(file_backup::Column::Id)
                    .all(&self.db)
                    .await?
            }
        };

        for record in records {
            if !record.is_pending() {
                debug!(file_backup_id = record.id, "Backup record already done, skipping");
                continue;
            }
            report.processed += 1;
            match self.backup_one(&record).await {
                Ok(true) => report.succeeded += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    error!(file_backup_id = record.id, error = %e, "File backup failed");
                }
            }
        }

        info!(
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            created = report.created,
            "Backup pass finished"
        );
        Ok(report)
    }

    /// Returns `Ok(false)` when another consumer finished the record first.
    async fn backup_one(&self, record: &file_backup::Model) -> Result<bool, BackupError> {
        let media = media_file::Entity::find_by_id(record.media_file_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("media file {}", record.media_file_id)))?;

        let key = BlobKey::parse(&media.file_key)?;
        let data = self.source.get(&key).await?;

        match tokio::time::timeout(self.upload_timeout, self.target.put_object(&key, data)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BackupError::Upload(e.to_string())),
            Err(_) => return Err(BackupError::Timeout(self.upload_timeout.as_secs())),
        }

        // Conditional stamp: a finished record never changes again.
        let result = file_backup::Entity::update_many()
            .col_expr(file_backup::Column::Done, Expr::value(Utc::now()))
            .filter(file_backup::Column::Id.eq(record.id))
            .filter(file_backup::Column::Done.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            warn!(file_backup_id = record.id, "Backup record was already done");
            return Ok(false);
        }
        info!(file_backup_id = record.id, key = %key, "File backed up");
        Ok(true)
    }
}

use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::backup::BackupTrigger;
use crate::config::AppConfig;
use crate::notify::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// Originals and thumbnails.
    pub blob_store: Arc<dyn BlobStore>,
    /// Wakes the backup consumer after a media file is committed.
    pub backup_trigger: Arc<dyn BackupTrigger>,
    pub notifier: Arc<dyn Notifier>,
}

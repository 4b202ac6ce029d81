use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wake-up message for the backup worker.
///
/// The message carries no state of its own: the `file_backup` table is the
/// source of truth, so a lost message only delays the backup until the next
/// sweep.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupJob {
    /// Job identifier (UUIDv7).
    pub job_id: String,
    /// A single pending record to process. `None` requests a full sweep.
    pub file_backup_id: Option<i32>,
}

impl BackupJob {
    /// Job for the backup record created alongside a new media file.
    pub fn single(file_backup_id: i32) -> Self {
        Self {
            job_id: Uuid::now_v7().to_string(),
            file_backup_id: Some(file_backup_id),
        }
    }

    /// Job that reconciles missing records and processes everything pending.
    pub fn sweep() -> Self {
        Self {
            job_id: Uuid::now_v7().to_string(),
            file_backup_id: None,
        }
    }

    pub fn is_sweep(&self) -> bool {
        self.file_backup_id.is_none()
    }
}

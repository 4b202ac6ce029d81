use serde::Serialize;

/// Response of a manually triggered backup sweep.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BackupSweepResponse {
    /// Backup records created for media files that had none.
    pub created: usize,
    /// Identifier of the enqueued sweep job.
    pub job_id: String,
}

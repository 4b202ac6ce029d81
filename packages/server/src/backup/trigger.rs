use std::sync::Arc;

use async_trait::async_trait;
use common::BackupJob;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("backup channel is full")]
    Saturated,
    #[error("backup channel is closed")]
    Closed,
    #[error("broker error: {0}")]
    Broker(String),
}

/// Send side of the backup channel.
#[async_trait]
pub trait BackupTrigger: Send + Sync {
    async fn trigger(&self, job: BackupJob) -> Result<(), TriggerError>;
}

/// Publishes jobs to the broker queue consumed by `rolca-worker`.
pub struct QueueBackupTrigger {
    mq: Arc<mq::Mq>,
    queue_name: String,
}

impl QueueBackupTrigger {
    pub fn new(mq: Arc<mq::Mq>, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl BackupTrigger for QueueBackupTrigger {
    async fn trigger(&self, job: BackupJob) -> Result<(), TriggerError> {
        self.mq
            .publish(&self.queue_name, None, &job, None)
            .await
            .map(|_| ())
            .map_err(|e| TriggerError::Broker(e.to_string()))
    }
}

/// Bounded in-process channel, used when no broker is configured.
///
/// Never waits for capacity: a full channel rejects the job.
pub struct ChannelBackupTrigger {
    tx: mpsc::Sender<BackupJob>,
}

impl ChannelBackupTrigger {
    /// Create the trigger together with the receiving end for the consumer.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<BackupJob>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl BackupTrigger for ChannelBackupTrigger {
    async fn trigger(&self, job: BackupJob) -> Result<(), TriggerError> {
        self.tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TriggerError::Saturated,
            mpsc::error::TrySendError::Closed(_) => TriggerError::Closed,
        })
    }
}

/// Send a job and swallow failures. The pending row stays behind for the
/// next sweep.
pub async fn fire_and_log(trigger: &dyn BackupTrigger, job: BackupJob) {
    let job_id = job.job_id.clone();
    match trigger.trigger(job).await {
        Ok(()) => debug!(job_id = %job_id, "Backup job enqueued"),
        Err(e) => warn!(job_id = %job_id, error = %e, "Cannot trigger backup"),
    }
}

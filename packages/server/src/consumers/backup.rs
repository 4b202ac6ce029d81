use std::sync::Arc;

use common::BackupJob;
use mq::{BroccoliError, BrokerMessage, Mq};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::backup::BackupRunner;

async fn run_job(runner: &BackupRunner, job: BackupJob) -> Result<(), BroccoliError> {
    info!(job_id = %job.job_id, file_backup_id = ?job.file_backup_id, "Processing backup job");
    if let Err(e) = runner.process(job.file_backup_id).await {
        error!(job_id = %job.job_id, error = %e, "Backup job failed");
        return Err(BroccoliError::Job(e.to_string()));
    }
    Ok(())
}

/// Consume backup jobs from the broker queue.
pub async fn consume_backup_jobs(
    runner: BackupRunner,
    mq: Arc<Mq>,
    queue_name: String,
    concurrency: Option<usize>,
) {
    info!(queue = %queue_name, "Starting backup consumer");

    let result = mq
        .process_messages(
            &queue_name,
            concurrency,
            None,
            move |message: BrokerMessage<BackupJob>| {
                let runner = runner.clone();
                async move { run_job(&runner, message.payload).await }
            },
        )
        .await;

    if let Err(e) = result {
        error!(error = %e, "Backup consumer stopped unexpectedly");
    }
}

/// Consume backup jobs from the in-process channel until every sender is dropped.
pub async fn consume_local_backup_jobs(runner: BackupRunner, mut rx: mpsc::Receiver<BackupJob>) {
    info!("Starting in-process backup consumer");
    while let Some(job) = rx.recv().await {
        // Failures are already logged; the records stay pending.
        let _ = run_job(&runner, job).await;
    }
    info!("In-process backup consumer stopped");
}

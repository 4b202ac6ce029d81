mod config;
mod error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use common::storage::{BlobStore, ObjectStore};
use common::storage::filesystem::FilesystemBlobStore;
use mq::{MqConfig, init_mq};
use server::backup::{BackupRunner, object_store_from_config};
use server::consumers::consume_backup_jobs;
use tracing::info;

use crate::config::WorkerAppConfig;
use crate::error::WorkerError;

#[derive(Parser)]
#[command(name = "rolca-worker", about = "Backs up uploaded media to object storage")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Consume backup jobs from the queue (default).
    Consume,
    /// Create missing backup records and back up everything pending, then exit.
    Sweep,
}

async fn build_runner(config: &WorkerAppConfig) -> error::Result<BackupRunner> {
    let db = server::database::init_db(&config.database.url).await?;
    let source: Arc<dyn BlobStore> =
        Arc::new(FilesystemBlobStore::new(PathBuf::from(&config.media.media_root)).await?);
    let target = object_store_from_config(&config.backup).await?;
    info!(target = %target.describe(), "Backup target ready");

    Ok(BackupRunner::new(
        db,
        source,
        target,
        Duration::from_secs(config.backup.upload_timeout_secs),
    ))
}

async fn sweep(config: &WorkerAppConfig) -> error::Result<()> {
    let runner = build_runner(config).await?;
    let report = runner.process(None).await?;
    info!(
        created = report.created,
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failed,
        "Sweep finished"
    );
    Ok(())
}

async fn consume(config: &WorkerAppConfig) -> error::Result<()> {
    if !config.mq.enabled {
        return Err(WorkerError::Mq(
            "broker is disabled; the server backs up in-process".into(),
        ));
    }

    let runner = build_runner(config).await?;
    let mq = Arc::new(
        init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await?,
    );
    info!(
        queue_name = %config.mq.queue_name,
        concurrency = config.worker.concurrency,
        "MQ connected"
    );

    consume_backup_jobs(
        runner,
        mq,
        config.mq.queue_name.clone(),
        Some(config.worker.concurrency),
    )
    .await;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let cli = Cli::parse();
    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker starting: {}", config.worker.id);

    match cli.command.unwrap_or(Command::Consume) {
        Command::Consume => consume(&config).await.context("Backup consumer failed")?,
        Command::Sweep => sweep(&config).await.context("Backup sweep failed")?,
    }

    Ok(())
}

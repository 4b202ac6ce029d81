use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::HeaderValue;
use common::storage::BlobStore;
use common::storage::filesystem::FilesystemBlobStore;
use mq::{MqConfig, init_mq};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use server::backup::{
    BackupRunner, BackupTrigger, ChannelBackupTrigger, QueueBackupTrigger, object_store_from_config,
};
use server::config::{AppConfig, CorsConfig};
use server::consumers::consume_local_backup_jobs;
use server::notify::{LogNotifier, Notifier, SmtpNotifier};
use server::state::AppState;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age));

    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if origins.is_empty() {
        layer
    } else {
        layer.allow_origin(origins)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = AppConfig::load().context("Failed to load config")?;

    let db = server::database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    server::seed::seed_role_permissions(&db)
        .await
        .context("Failed to seed roles")?;
    server::seed::ensure_indexes(&db)
        .await
        .context("Failed to create indexes")?;
    server::seed::seed_admin(&db, &config.auth)
        .await
        .context("Failed to seed admin account")?;

    let blob_store: Arc<dyn BlobStore> = Arc::new(
        FilesystemBlobStore::new(PathBuf::from(&config.media.media_root))
            .await
            .context("Failed to open media root")?,
    );
    info!(media_root = %config.media.media_root, "Media store ready");

    let backup_trigger: Arc<dyn BackupTrigger> = if config.mq.enabled {
        let mq = init_mq(MqConfig {
            url: config.mq.url.clone(),
            pool_size: config.mq.pool_size,
        })
        .await
        .context("Failed to initialize MQ")?;
        info!(queue_name = %config.mq.queue_name, "MQ connected, backups run in rolca-worker");
        Arc::new(QueueBackupTrigger::new(
            Arc::new(mq),
            config.mq.queue_name.clone(),
        ))
    } else {
        let target = object_store_from_config(&config.backup)
            .await
            .context("Failed to open backup target")?;
        let runner = BackupRunner::new(
            db.clone(),
            Arc::clone(&blob_store),
            target,
            Duration::from_secs(config.backup.upload_timeout_secs),
        );
        let (trigger, rx) = ChannelBackupTrigger::bounded(config.mq.channel_capacity);
        tokio::spawn(consume_local_backup_jobs(runner, rx));
        Arc::new(trigger)
    };

    let notifier: Arc<dyn Notifier> = if config.mail.enabled {
        Arc::new(SmtpNotifier::new(&config.mail).context("Failed to configure SMTP")?)
    } else {
        Arc::new(LogNotifier)
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    let cors = cors_layer(&config.server.cors);

    let state = AppState {
        db,
        config,
        blob_store,
        backup_trigger,
        notifier,
    };
    let app = server::build_router(state).layer(cors);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

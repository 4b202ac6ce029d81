use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{BackupConfig, MqAppConfig};
pub use server::config::{DatabaseConfig, MediaConfig};

/// Worker-specific configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Unique identifier for this worker instance. Default: "worker-1".
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Backup jobs processed concurrently. Default: 4.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_worker_id() -> String {
    "worker-1".into()
}
fn default_concurrency() -> usize {
    4
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            id: default_worker_id(),
            concurrency: default_concurrency(),
        }
    }
}

/// Worker application configuration.
///
/// Shares `config/config.toml` and the `ROLCA__` environment prefix with the
/// server, so `database`, `media`, `backup` and `mq` are read from the same
/// sections.
#[derive(Debug, Deserialize, Clone)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub worker: WorkerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("ROLCA_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("mq.enabled", true)?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("ROLCA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

use serde::Deserialize;

/// App-level MQ configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct MqAppConfig {
    /// Whether the Redis broker is used. When disabled the server runs the
    /// backup consumer in-process over a bounded channel. Default: false.
    #[serde(default = "default_mq_enabled")]
    pub enabled: bool,
    /// Redis connection URL. Default: "redis://localhost:6379".
    #[serde(default = "default_mq_url")]
    pub url: String,
    /// Connection pool size. Default: 5.
    #[serde(default = "default_mq_pool_size")]
    pub pool_size: u8,
    /// Queue carrying backup jobs (server publishes, worker consumes). Default: "file_backups".
    #[serde(default = "default_mq_queue_name")]
    pub queue_name: String,
    /// Capacity of the in-process channel used when the broker is disabled. Default: 256.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_mq_enabled() -> bool {
    false
}
fn default_mq_url() -> String {
    "redis://localhost:6379".into()
}
fn default_mq_pool_size() -> u8 {
    5
}
fn default_mq_queue_name() -> String {
    "file_backups".into()
}
fn default_channel_capacity() -> usize {
    256
}

impl Default for MqAppConfig {
    fn default() -> Self {
        Self {
            enabled: default_mq_enabled(),
            url: default_mq_url(),
            pool_size: default_mq_pool_size(),
            queue_name: default_mq_queue_name(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Off-site backup target.
///
/// When `bucket` is empty the backup is mirrored into `local_dir` instead,
/// which is what development setups and tests use.
#[derive(Debug, Deserialize, Clone)]
pub struct BackupConfig {
    #[serde(default)]
    pub bucket: String,
    #[serde(default = "default_backup_region")]
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, Ceph, ...). Empty means AWS.
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default = "default_backup_local_dir")]
    pub local_dir: String,
    /// Upper bound for a single upload. Default: 120.
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,
}

fn default_backup_region() -> String {
    "eu-central-1".into()
}
fn default_backup_local_dir() -> String {
    "./data/backup".into()
}
fn default_upload_timeout_secs() -> u64 {
    120
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_backup_region(),
            endpoint: String::new(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            local_dir: default_backup_local_dir(),
            upload_timeout_secs: default_upload_timeout_secs(),
        }
    }
}

impl BackupConfig {
    pub fn uses_bucket(&self) -> bool {
        !self.bucket.trim().is_empty()
    }
}

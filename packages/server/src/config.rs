use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub use common::config::{BackupConfig, MqAppConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Account created on startup with the `admin` role if it does not exist yet.
    #[serde(default)]
    pub admin_username: Option<String>,
    #[serde(default)]
    pub admin_password: Option<String>,
}

/// Limits and storage for uploaded photos.
#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Maximum upload size in bytes. Default: 10 MiB.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
    /// Maximum length of the longer image edge in pixels. Default: 4096.
    #[serde(default = "default_max_upload_resolution")]
    pub max_upload_resolution: u32,
    /// Directory holding `photos/` and `thumbs/`. Default: "./data/media".
    #[serde(default = "default_media_root")]
    pub media_root: String,
    /// Bounding box of generated thumbnails in pixels. Default: 400.
    #[serde(default = "default_thumbnail_size")]
    pub thumbnail_size: u32,
    /// JPEG quality of generated thumbnails. Default: 85.
    #[serde(default = "default_thumbnail_quality")]
    pub thumbnail_quality: u8,
    /// Image formats accepted for upload. Default: ["jpeg", "png"].
    #[serde(default = "default_accepted_formats")]
    pub accepted_formats: Vec<String>,
}

fn default_max_upload_size() -> u64 {
    10 * 1024 * 1024
}
fn default_max_upload_resolution() -> u32 {
    4096
}
fn default_media_root() -> String {
    "./data/media".into()
}
fn default_thumbnail_size() -> u32 {
    400
}
fn default_thumbnail_quality() -> u8 {
    85
}
fn default_accepted_formats() -> Vec<String> {
    vec!["jpeg".into(), "png".into()]
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            max_upload_size: default_max_upload_size(),
            max_upload_resolution: default_max_upload_resolution(),
            media_root: default_media_root(),
            thumbnail_size: default_thumbnail_size(),
            thumbnail_quality: default_thumbnail_quality(),
            accepted_formats: default_accepted_formats(),
        }
    }
}

/// Outgoing mail for submission confirmations.
#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// When disabled, confirmations are only logged. Default: false.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default)]
    pub smtp_username: String,
    #[serde(default)]
    pub smtp_password: String,
    #[serde(default = "default_mail_from")]
    pub from: String,
}

fn default_mail_from() -> String {
    "Rolca <noreply@localhost>".into()
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_username: String::new(),
            smtp_password: String::new(),
            from: default_mail_from(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub backup: BackupConfig,
    #[serde(default)]
    pub mq: MqAppConfig,
    #[serde(default)]
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., ROLCA__MEDIA__MAX_UPLOAD_SIZE)
            .add_source(Environment::with_prefix("ROLCA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

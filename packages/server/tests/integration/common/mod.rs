use std::io::Cursor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ::common::storage::BlobStore;
use ::common::storage::filesystem::FilesystemBlobStore;
use image::{ImageBuffer, ImageFormat, Rgb};
use reqwest::Client;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::sync::mpsc;

use server::backup::{BackupJob, BackupRunner, ChannelBackupTrigger};
use server::config::{
    AppConfig, AuthConfig, BackupConfig, CorsConfig, DatabaseConfig, MailConfig, MediaConfig,
    MqAppConfig, ServerConfig,
};
use server::entity::{file_backup, media_file, user};
use server::notify::{Confirmation, Notifier, NotifyError};
use server::state::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const CONTESTS: &str = "/api/v1/contests";
    pub const AUTHORS: &str = "/api/v1/authors";
    pub const MEDIA: &str = "/api/v1/media";
    pub const SUBMISSIONS: &str = "/api/v1/submissions";
    pub const SUBMISSION_SETS: &str = "/api/v1/submission-sets";
    pub const PAYMENTS: &str = "/api/v1/payments";
    pub const RATINGS: &str = "/api/v1/ratings";
    pub const JUDGE_CONTESTS: &str = "/api/v1/judge/contests";
    pub const JUDGE_SUBMISSIONS: &str = "/api/v1/judge/submissions";
    pub const SUBMISSION_RESULTS: &str = "/api/v1/results/submissions";
    pub const BACKUP_SWEEP: &str = "/api/v1/backup/sweep";

    pub fn contest(id: i32) -> String {
        format!("/api/v1/contests/{id}")
    }

    pub fn contest_themes(id: i32) -> String {
        format!("/api/v1/contests/{id}/themes")
    }

    pub fn contest_judges(id: i32) -> String {
        format!("/api/v1/contests/{id}/judges")
    }

    pub fn contest_judge(id: i32, user_id: i32) -> String {
        format!("/api/v1/contests/{id}/judges/{user_id}")
    }

    pub fn theme(id: i32) -> String {
        format!("/api/v1/themes/{id}")
    }

    pub fn theme_results_config(id: i32) -> String {
        format!("/api/v1/themes/{id}/results")
    }

    pub fn author(id: i32) -> String {
        format!("/api/v1/authors/{id}")
    }

    pub fn author_reward(id: i32) -> String {
        format!("/api/v1/authors/{id}/reward")
    }

    pub fn media(id: i32) -> String {
        format!("/api/v1/media/{id}")
    }

    pub fn media_file(id: i32) -> String {
        format!("/api/v1/media/{id}/file")
    }

    pub fn media_thumbnail(id: i32) -> String {
        format!("/api/v1/media/{id}/thumbnail")
    }

    pub fn submission(id: i32) -> String {
        format!("/api/v1/submissions/{id}")
    }

    pub fn submission_reward(id: i32) -> String {
        format!("/api/v1/submissions/{id}/reward")
    }

    pub fn submission_set(id: i32) -> String {
        format!("/api/v1/submission-sets/{id}")
    }

    pub fn payment(submission_set_id: i32) -> String {
        format!("/api/v1/payments/{submission_set_id}")
    }

    pub fn theme_results(id: i32) -> String {
        format!("/api/v1/results/themes/{id}")
    }

    pub fn submission_result(id: i32) -> String {
        format!("/api/v1/results/submissions/{id}")
    }
}

/// Notifier that keeps every confirmation in memory.
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Confirmation>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_confirmation(&self, confirmation: Confirmation) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(confirmation);
        Ok(())
    }
}

/// A running test server backed by a temporary SQLite database.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub blob_store: Arc<dyn BlobStore>,
    pub notifier: Arc<RecordingNotifier>,
    /// Receiving end of the backup channel; nothing consumes it unless a test does.
    pub backup_jobs: tokio::sync::Mutex<mpsc::Receiver<BackupJob>>,
    dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

/// Encode a solid-colour PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgb([40u8, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// RFC 3339 timestamp `hours` from now (negative for the past).
pub fn hours_from_now(hours: i64) -> String {
    (Utc::now() + chrono::Duration::hours(hours)).to_rfc3339()
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a customised media configuration.
    pub async fn spawn_with(customize: impl FnOnce(&mut MediaConfig)) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_url = format!("sqlite://{}?mode=rwc", dir.path().join("rolca.db").display());

        let mut media = MediaConfig {
            media_root: dir.path().join("media").display().to_string(),
            ..Default::default()
        };
        customize(&mut media);

        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: DatabaseConfig {
                url: db_url.clone(),
            },
            auth: AuthConfig {
                jwt_secret: "test-secret-for-integration-tests".to_string(),
                admin_username: Some(ADMIN_USERNAME.to_string()),
                admin_password: Some(ADMIN_PASSWORD.to_string()),
            },
            media,
            backup: BackupConfig {
                local_dir: dir.path().join("backup").display().to_string(),
                upload_timeout_secs: 5,
                ..Default::default()
            },
            mq: MqAppConfig {
                enabled: false,
                ..Default::default()
            },
            mail: MailConfig::default(),
        };

        let db = server::database::init_db(&db_url)
            .await
            .expect("Failed to initialize test database");
        server::seed::seed_role_permissions(&db)
            .await
            .expect("Failed to seed roles");
        server::seed::ensure_indexes(&db)
            .await
            .expect("Failed to create indexes");
        server::seed::seed_admin(&db, &config.auth)
            .await
            .expect("Failed to seed admin");

        let blob_store: Arc<dyn BlobStore> = Arc::new(
            FilesystemBlobStore::new(PathBuf::from(&config.media.media_root))
                .await
                .expect("Failed to open media root"),
        );
        let (trigger, rx) = ChannelBackupTrigger::bounded(64);
        let notifier = Arc::new(RecordingNotifier::default());

        let state = AppState {
            db: db.clone(),
            config: config.clone(),
            blob_store: Arc::clone(&blob_store),
            backup_trigger: Arc::new(trigger),
            notifier: notifier.clone(),
        };

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            db,
            config,
            blob_store,
            notifier,
            backup_jobs: tokio::sync::Mutex::new(rx),
            dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Directory the local backup target writes to.
    pub fn backup_dir(&self) -> PathBuf {
        self.dir.path().join("backup")
    }

    /// Runner that backs up into [`Self::backup_dir`].
    pub async fn backup_runner(&self) -> BackupRunner {
        let target = server::backup::object_store_from_config(&self.config.backup)
            .await
            .expect("Failed to open backup target");
        BackupRunner::new(
            self.db.clone(),
            Arc::clone(&self.blob_store),
            target,
            Duration::from_secs(self.config.backup.upload_timeout_secs),
        )
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    /// GET returning the raw body and content type.
    pub async fn get_bytes(&self, path: &str, token: Option<&str>) -> (u16, String, Vec<u8>) {
        let mut req = self.client.get(self.url(path));
        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        let res = req.send().await.expect("Failed to send GET request");
        let status = res.status().as_u16();
        let content_type = res
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = res.bytes().await.unwrap_or_default().to_vec();
        (status, content_type, bytes)
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn put_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .put(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PUT request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    pub async fn upload_with_token(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        token: &str,
    ) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name.to_string())
            .mime_str("image/png")
            .expect("Failed to set MIME type");
        let form = reqwest::multipart::Form::new().part("file", part);

        let res = self
            .client
            .post(self.url(routes::MEDIA))
            .header("Authorization", format!("Bearer {token}"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let res = self
            .post_without_token(
                routes::LOGIN,
                &json!({"username": username, "password": password}),
            )
            .await;
        assert_eq!(res.status, 200, "Login failed: {}", res.text);

        res.body["token"]
            .as_str()
            .expect("Login response should contain a token")
            .to_string()
    }

    /// Log in as the seeded admin account.
    pub async fn admin_token(&self) -> String {
        self.login(ADMIN_USERNAME, ADMIN_PASSWORD).await
    }

    /// Register a user with an email address and log in, returning the auth token.
    pub async fn create_authenticated_user(&self, username: &str) -> String {
        let body = json!({
            "username": username,
            "password": "securepass",
            "email": format!("{username}@example.com"),
        });

        let reg = self.post_without_token(routes::REGISTER, &body).await;
        assert_eq!(reg.status, 201, "Registration failed: {}", reg.text);

        self.login(username, "securepass").await
    }

    pub async fn user_id(&self, username: &str) -> i32 {
        user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .expect("DB query failed")
            .expect("User not found")
            .id
    }

    /// Create a contest open for submissions, publishing in the far future.
    pub async fn create_open_contest(&self, admin: &str, title: &str) -> i32 {
        self.create_contest(admin, title, &hours_from_now(-24), &hours_from_now(24 * 365))
            .await
    }

    pub async fn create_contest(&self, admin: &str, title: &str, start: &str, end: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::CONTESTS,
                &json!({
                    "title": title,
                    "description": "Annual salon",
                    "start_date": start,
                    "end_date": end,
                }),
                admin,
            )
            .await;
        assert_eq!(res.status, 201, "create_contest failed: {}", res.text);
        res.id()
    }

    /// Move the contest's end and publish date into the past.
    pub async fn publish_contest(&self, admin: &str, contest_id: i32) {
        let res = self
            .patch_with_token(
                &routes::contest(contest_id),
                &json!({
                    "end_date": hours_from_now(-2),
                    "publish_date": hours_from_now(-1),
                }),
                admin,
            )
            .await;
        assert_eq!(res.status, 200, "publish_contest failed: {}", res.text);
    }

    pub async fn create_theme(&self, admin: &str, contest_id: i32, n_photos: i32) -> i32 {
        let res = self
            .post_with_token(
                &routes::contest_themes(contest_id),
                &json!({"title": "Open colour", "n_photos": n_photos}),
                admin,
            )
            .await;
        assert_eq!(res.status, 201, "create_theme failed: {}", res.text);
        res.id()
    }

    pub async fn create_author(&self, token: &str) -> i32 {
        let res = self
            .post_with_token(
                routes::AUTHORS,
                &json!({
                    "first_name": "Ana",
                    "last_name": "Novak",
                    "email": "ana@example.com",
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_author failed: {}", res.text);
        res.id()
    }

    /// Upload a 50x50 PNG and return the media file id.
    pub async fn upload_photo(&self, token: &str) -> i32 {
        let res = self.upload_with_token("photo.png", png(50, 50), token).await;
        assert_eq!(res.status, 201, "upload failed: {}", res.text);
        res.id()
    }

    pub async fn submit(
        &self,
        token: &str,
        author_id: i32,
        theme_id: i32,
        media_ids: &[i32],
    ) -> TestResponse {
        self.post_with_token(
            routes::SUBMISSIONS,
            &json!({
                "author_id": author_id,
                "theme_id": theme_id,
                "media_ids": media_ids,
                "title": "Morning fog",
            }),
            token,
        )
        .await
    }

    pub async fn add_judge(&self, admin: &str, contest_id: i32, user_id: i32) {
        let res = self
            .post_with_token(
                &routes::contest_judges(contest_id),
                &json!({"user_id": user_id}),
                admin,
            )
            .await;
        assert_eq!(res.status, 201, "add_judge failed: {}", res.text);
    }

    pub async fn media_count(&self) -> u64 {
        media_file::Entity::find().count(&self.db).await.unwrap()
    }

    pub async fn backups(&self) -> Vec<file_backup::Model> {
        file_backup::Entity::find().all(&self.db).await.unwrap()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }
}

use ::common::storage::{BlobKey, BlobStore};
use sea_orm::EntityTrait;
use server::entity::media_file;

use crate::common::{TestApp, png, routes};

mod runner {
    use super::*;

    #[tokio::test]
    async fn sweep_copies_pending_upload_and_stamps_it_done() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;
        let id = app.upload_photo(&token).await;

        let backups = app.backups().await;
        assert_eq!(backups.len(), 1);
        assert!(backups[0].is_pending());

        let runner = app.backup_runner().await;
        let report = runner.process(None).await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(report.created, 0);

        let backup = &app.backups().await[0];
        let done = backup.done.expect("backup should be stamped done");
        assert!(done >= backup.created_at);

        let media = media_file::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        let copied = std::fs::read(app.backup_dir().join(&media.file_key)).unwrap();
        assert_eq!(copied, png(50, 50));

        let again = runner.process(None).await.unwrap();
        assert_eq!(again.processed, 0);
        assert_eq!(app.backups().await[0].done, Some(done));
    }

    #[tokio::test]
    async fn queued_job_targets_the_new_record() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;
        app.upload_photo(&token).await;
        app.upload_photo(&token).await;

        let job = app.backup_jobs.lock().await.try_recv().unwrap();
        let first = app.backups().await[0].id;
        assert_eq!(job.file_backup_id, Some(first));

        let report = app.backup_runner().await.process(job.file_backup_id).await.unwrap();
        assert_eq!(report.processed, 1);

        let backups = app.backups().await;
        assert!(!backups[0].is_pending());
        assert!(backups[1].is_pending());
    }

    #[tokio::test]
    async fn job_for_finished_record_is_skipped() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;
        app.upload_photo(&token).await;
        let runner = app.backup_runner().await;
        let id = app.backups().await[0].id;

        let first = runner.process(Some(id)).await.unwrap();
        assert_eq!(first.succeeded, 1);
        let done = app.backups().await[0].done;
        assert!(done.is_some());

        let again = runner.process(Some(id)).await.unwrap();
        assert_eq!(again.processed, 0);
        assert_eq!(again.succeeded, 0);
        assert_eq!(app.backups().await[0].done, done);

        let missing = runner.process(Some(id + 100)).await.unwrap();
        assert_eq!(missing.processed, 0);
    }

    #[tokio::test]
    async fn failed_upload_stays_pending() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;
        let id = app.upload_photo(&token).await;
        let media = media_file::Entity::find_by_id(id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        app.blob_store
            .delete(&BlobKey::parse(&media.file_key).unwrap())
            .await
            .unwrap();

        let report = app.backup_runner().await.process(None).await.unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        assert!(app.backups().await[0].is_pending());
    }

    #[tokio::test]
    async fn sweep_creates_missing_records() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;
        app.upload_photo(&token).await;
        server::entity::file_backup::Entity::delete_many()
            .exec(&app.db)
            .await
            .unwrap();

        let report = app.backup_runner().await.process(None).await.unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.succeeded, 1);
        assert!(!app.backups().await[0].is_pending());
    }
}

mod endpoint {
    use super::*;

    #[tokio::test]
    async fn admin_requests_sweep() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(routes::BACKUP_SWEEP, &serde_json::json!({}), &admin)
            .await;

        assert_eq!(res.status, 202, "{}", res.text);
        assert_eq!(res.body["created"], 0);
        let job = app.backup_jobs.lock().await.try_recv().unwrap();
        assert!(job.is_sweep());
        assert_eq!(res.body["job_id"], job.job_id);
    }

    #[tokio::test]
    async fn regular_user_cannot_request_sweep() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;

        let res = app
            .post_with_token(routes::BACKUP_SWEEP, &serde_json::json!({}), &token)
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }
}

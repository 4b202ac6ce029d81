use server::entity::{file_backup, media_file};
use sea_orm::{EntityTrait, PaginatorTrait};

use crate::common::{TestApp, png, routes};

mod upload {
    use super::*;

    #[tokio::test]
    async fn accepted_photo_is_stored_with_thumbnail() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;

        let res = app.upload_with_token("photo.png", png(80, 40), &token).await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["width"], 80);
        assert_eq!(res.body["height"], 40);
        assert_eq!(res.body["content_type"], "image/png");
        assert!(res.body["submission_id"].is_null());
        let id = res.id();
        assert_eq!(res.body["file"], format!("/api/v1/media/{id}/file"));

        let (status, content_type, bytes) =
            app.get_bytes(&routes::media_file(id), Some(&token)).await;
        assert_eq!(status, 200);
        assert_eq!(content_type, "image/png");
        assert_eq!(bytes, png(80, 40));

        let (status, content_type, bytes) =
            app.get_bytes(&routes::media_thumbnail(id), Some(&token)).await;
        assert_eq!(status, 200);
        assert_eq!(content_type, "image/jpeg");
        let thumb = image::load_from_memory(&bytes).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (80, 40));
    }

    #[tokio::test]
    async fn file_over_max_upload_size_is_rejected_and_nothing_persists() {
        let app = TestApp::spawn_with(|media| media.max_upload_size = 10).await;
        let token = app.create_authenticated_user("ana").await;

        let res = app.upload_with_token("photo.png", png(50, 50), &token).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
        assert_eq!(res.body["field"], "file");
        assert_eq!(res.body["message"], "Max size of file is 10B");
        assert_eq!(app.media_count().await, 0);
        assert_eq!(file_backup::Entity::find().count(&app.db).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn photo_over_max_resolution_is_rejected() {
        let app = TestApp::spawn_with(|media| media.max_upload_resolution = 50).await;
        let token = app.create_authenticated_user("ana").await;

        let res = app.upload_with_token("photo.png", png(10, 51), &token).await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Max photo resolution is 50px");
        assert_eq!(app.media_count().await, 0);

        let res = app.upload_with_token("photo.png", png(50, 50), &token).await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn non_image_is_rejected() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;

        let res = app
            .upload_with_token("notes.txt", b"just some text".to_vec(), &token)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Unsupported image format");
        assert_eq!(app.media_count().await, 0);
    }

    #[tokio::test]
    async fn upload_requires_a_token() {
        let app = TestApp::spawn().await;
        let form = reqwest::multipart::Form::new()
            .part("file", reqwest::multipart::Part::bytes(png(10, 10)));

        let res = app
            .client
            .post(format!("http://{}{}", app.addr, routes::MEDIA))
            .multipart(form)
            .send()
            .await
            .unwrap();

        assert_eq!(res.status().as_u16(), 401);
    }

    #[tokio::test]
    async fn upload_creates_one_pending_backup_and_enqueues_it() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;

        let id = app.upload_photo(&token).await;

        let backups = app.backups().await;
        assert_eq!(backups.len(), 1);
        assert_eq!(backups[0].media_file_id, id);
        assert!(backups[0].done.is_none());

        let job = app.backup_jobs.lock().await.try_recv().unwrap();
        assert_eq!(job.file_backup_id, Some(backups[0].id));
    }
}

mod access {
    use super::*;

    #[tokio::test]
    async fn other_users_cannot_see_or_download_unlinked_photos() {
        let app = TestApp::spawn().await;
        let ana = app.create_authenticated_user("ana").await;
        let bor = app.create_authenticated_user("bor").await;
        let id = app.upload_photo(&ana).await;

        let res = app.get_with_token(&routes::media(id), &bor).await;
        assert_eq!(res.status, 404);

        let (status, _, _) = app.get_bytes(&routes::media_file(id), Some(&bor)).await;
        assert_eq!(status, 404);

        let (status, _, _) = app.get_bytes(&routes::media_file(id), None).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn unlinked_filter_hides_submitted_photos() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;
        let theme = app.create_theme(&admin, contest, 1).await;
        let ana = app.create_authenticated_user("ana").await;
        let author = app.create_author(&ana).await;
        let used = app.upload_photo(&ana).await;
        let free = app.upload_photo(&ana).await;
        app.submit(&ana, author, theme, &[used]).await;

        let res = app
            .get_with_token(&format!("{}?unlinked=true", routes::MEDIA), &ana)
            .await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["id"], free);

        let res = app.get_with_token(routes::MEDIA, &ana).await;
        assert_eq!(res.body["total"], 2);
    }

    #[tokio::test]
    async fn deleting_an_unused_photo_removes_row_and_backup() {
        let app = TestApp::spawn().await;
        let ana = app.create_authenticated_user("ana").await;
        let id = app.upload_photo(&ana).await;

        let res = app.delete_with_token(&routes::media(id), &ana).await;
        assert_eq!(res.status, 204);

        assert!(media_file::Entity::find_by_id(id).one(&app.db).await.unwrap().is_none());
        assert!(app.backups().await.is_empty());
    }

    #[tokio::test]
    async fn photo_in_a_submission_cannot_be_deleted_directly() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;
        let theme = app.create_theme(&admin, contest, 1).await;
        let ana = app.create_authenticated_user("ana").await;
        let author = app.create_author(&ana).await;
        let photo = app.upload_photo(&ana).await;
        app.submit(&ana, author, theme, &[photo]).await;

        let res = app.delete_with_token(&routes::media(photo), &ana).await;

        assert_eq!(res.status, 409);
    }
}

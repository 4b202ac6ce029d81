use serde_json::json;

use crate::common::{TestApp, hours_from_now, routes};

mod management {
    use super::*;

    #[tokio::test]
    async fn regular_user_cannot_create_contests() {
        let app = TestApp::spawn().await;
        let token = app.create_authenticated_user("ana").await;

        let res = app
            .post_with_token(
                routes::CONTESTS,
                &json!({
                    "title": "Salon",
                    "start_date": hours_from_now(-1),
                    "end_date": hours_from_now(24),
                }),
                &token,
            )
            .await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn publish_date_defaults_to_end_date() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let id = app.create_open_contest(&admin, "Salon").await;

        let res = app.get_without_token(&routes::contest(id)).await;

        assert_eq!(res.status, 200);
        assert_eq!(res.body["publish_date"], res.body["end_date"]);
        assert_eq!(res.body["is_active"], true);
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::CONTESTS,
                &json!({
                    "title": "Salon",
                    "start_date": hours_from_now(10),
                    "end_date": hours_from_now(1),
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["field"], "end_date");
    }

    #[tokio::test]
    async fn publish_before_end_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;

        let res = app
            .post_with_token(
                routes::CONTESTS,
                &json!({
                    "title": "Salon",
                    "start_date": hours_from_now(-10),
                    "end_date": hours_from_now(10),
                    "publish_date": hours_from_now(5),
                }),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["field"], "publish_date");
    }

    #[tokio::test]
    async fn extending_end_past_publish_date_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let id = app.create_open_contest(&admin, "Salon").await;

        let res = app
            .patch_with_token(
                &routes::contest(id),
                &json!({"end_date": hours_from_now(24 * 400)}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["field"], "publish_date");

        let res = app
            .patch_with_token(
                &routes::contest(id),
                &json!({
                    "end_date": hours_from_now(24 * 400),
                    "publish_date": hours_from_now(24 * 401),
                }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
    }

    #[tokio::test]
    async fn contest_without_submissions_can_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let id = app.create_open_contest(&admin, "Salon").await;
        app.create_theme(&admin, id, 4).await;

        let res = app.delete_with_token(&routes::contest(id), &admin).await;
        assert_eq!(res.status, 204);

        let res = app.get_without_token(&routes::contest(id)).await;
        assert_eq!(res.status, 404);
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn is_active_filter_splits_open_and_closed_contests() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let open = app.create_open_contest(&admin, "Open").await;
        let closed = app
            .create_contest(&admin, "Closed", &hours_from_now(-48), &hours_from_now(-24))
            .await;

        let res = app
            .get_without_token(&format!("{}?is_active=true", routes::CONTESTS))
            .await;
        assert_eq!(res.status, 200);
        let ids: Vec<i64> = res.body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![open as i64]);

        let res = app
            .get_without_token(&format!("{}?is_active=false", routes::CONTESTS))
            .await;
        assert_eq!(res.body["data"][0]["id"], closed);
        assert_eq!(res.body["total"], 1);
    }

    #[tokio::test]
    async fn submitted_filter_requires_authentication() {
        let app = TestApp::spawn().await;

        let res = app
            .get_without_token(&format!("{}?submitted=true", routes::CONTESTS))
            .await;

        assert_eq!(res.status, 401);
    }

    #[tokio::test]
    async fn submitted_filter_tracks_the_callers_entries() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let entered = app.create_open_contest(&admin, "Entered").await;
        let other = app.create_open_contest(&admin, "Other").await;
        let theme = app.create_theme(&admin, entered, 2).await;

        let token = app.create_authenticated_user("ana").await;
        let author = app.create_author(&token).await;
        let photo = app.upload_photo(&token).await;
        let res = app.submit(&token, author, theme, &[photo]).await;
        assert_eq!(res.status, 201, "{}", res.text);

        let res = app
            .get_with_token(&format!("{}?submitted=true", routes::CONTESTS), &token)
            .await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["id"], entered);

        let res = app
            .get_with_token(&format!("{}?submitted=false", routes::CONTESTS), &token)
            .await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["id"], other);
    }
}

mod themes {
    use super::*;

    #[tokio::test]
    async fn theme_counts_its_submissions() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;
        let theme = app.create_theme(&admin, contest, 2).await;

        let token = app.create_authenticated_user("ana").await;
        let author = app.create_author(&token).await;
        let photo = app.upload_photo(&token).await;
        app.submit(&token, author, theme, &[photo]).await;

        let res = app.get_without_token(&routes::theme(theme)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["submissions_number"], 1);

        let res = app.get_without_token(&routes::contest(contest)).await;
        assert_eq!(res.body["themes"][0]["submissions_number"], 1);
    }

    #[tokio::test]
    async fn n_photos_must_be_positive() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;

        let res = app
            .post_with_token(
                &routes::contest_themes(contest),
                &json!({"title": "Nature", "n_photos": 0}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["field"], "n_photos");
    }

    #[tokio::test]
    async fn theme_with_submissions_cannot_be_deleted() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;
        let theme = app.create_theme(&admin, contest, 2).await;
        let token = app.create_authenticated_user("ana").await;
        let author = app.create_author(&token).await;
        let photo = app.upload_photo(&token).await;
        app.submit(&token, author, theme, &[photo]).await;

        let res = app.delete_with_token(&routes::theme(theme), &admin).await;
        assert_eq!(res.status, 409);

        let res = app.delete_with_token(&routes::contest(contest), &admin).await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn results_config_is_admin_only() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;
        let theme = app.create_theme(&admin, contest, 2).await;
        let token = app.create_authenticated_user("ana").await;

        let body = json!({"accepted_threshold": 12});
        let res = app
            .put_with_token(&routes::theme_results_config(theme), &body, &token)
            .await;
        assert_eq!(res.status, 403);

        let res = app
            .put_with_token(&routes::theme_results_config(theme), &body, &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["accepted_threshold"], 12);

        let res = app
            .put_with_token(
                &routes::theme_results_config(theme),
                &json!({"accepted_threshold": 7}),
                &admin,
            )
            .await;
        assert_eq!(res.body["accepted_threshold"], 7);
    }
}

mod judges {
    use super::*;

    #[tokio::test]
    async fn admin_assigns_and_removes_judges() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;
        app.create_authenticated_user("jure").await;
        let judge_id = app.user_id("jure").await;

        app.add_judge(&admin, contest, judge_id).await;

        let res = app
            .post_with_token(
                &routes::contest_judges(contest),
                &json!({"user_id": judge_id}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 409);

        let res = app.get_with_token(&routes::contest_judges(contest), &admin).await;
        assert_eq!(res.body.as_array().unwrap().len(), 1);
        assert_eq!(res.body[0]["username"], "jure");

        let res = app
            .delete_with_token(&routes::contest_judge(contest, judge_id), &admin)
            .await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::contest_judges(contest), &admin).await;
        assert!(res.body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_user_cannot_be_assigned() {
        let app = TestApp::spawn().await;
        let admin = app.admin_token().await;
        let contest = app.create_open_contest(&admin, "Salon").await;

        let res = app
            .post_with_token(
                &routes::contest_judges(contest),
                &json!({"user_id": 9999}),
                &admin,
            )
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.body["field"], "user_id");
    }
}

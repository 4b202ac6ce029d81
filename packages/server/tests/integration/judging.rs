use serde_json::json;

use crate::common::{TestApp, routes};

/// An open contest with one paid submission and an assigned judge.
struct Judged {
    admin: String,
    judge: String,
    entrant: String,
    contest: i32,
    theme: i32,
    submission: i32,
    photo: i32,
}

async fn judged(app: &TestApp) -> Judged {
    let admin = app.admin_token().await;
    let contest = app.create_open_contest(&admin, "Salon 2026").await;
    let theme = app.create_theme(&admin, contest, 1).await;

    let entrant = app.create_authenticated_user("ana").await;
    let author = app.create_author(&entrant).await;
    let photo = app.upload_photo(&entrant).await;
    let set = app.submit(&entrant, author, theme, &[photo]).await;
    assert_eq!(set.status, 201, "{}", set.text);
    let submission = set.body["submissions"][0]["id"].as_i64().unwrap() as i32;
    let res = app
        .put_with_token(&routes::payment(set.id()), &json!({"paid": true}), &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);

    let judge = app.create_authenticated_user("judy").await;
    app.add_judge(&admin, contest, app.user_id("judy").await).await;

    Judged {
        admin,
        judge,
        entrant,
        contest,
        theme,
        submission,
        photo,
    }
}

async fn rate(app: &TestApp, token: &str, submission: i32, rating: i32) -> crate::common::TestResponse {
    app.post_with_token(
        routes::RATINGS,
        &json!({"submission": submission, "rating": rating}),
        token,
    )
    .await
}

async fn set_threshold(app: &TestApp, admin: &str, theme: i32, threshold: i32) {
    let res = app
        .put_with_token(
            &routes::theme_results_config(theme),
            &json!({"accepted_threshold": threshold}),
            admin,
        )
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
}

mod rating {
    use super::*;

    #[tokio::test]
    async fn rerating_replaces_previous_score() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;

        let first = rate(&app, &j.judge, j.submission, 5).await;
        assert_eq!(first.status, 201, "{}", first.text);
        let second = rate(&app, &j.judge, j.submission, 3).await;
        assert_eq!(second.status, 201, "{}", second.text);
        assert_eq!(second.body["id"], first.body["id"]);

        let res = app.get_with_token(routes::RATINGS, &j.judge).await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["rating"], 3);
        assert_eq!(res.body["data"][0]["submission"], j.submission);
    }

    #[tokio::test]
    async fn ratings_of_all_judges_are_summed() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        let second = app.create_authenticated_user("jan").await;
        app.add_judge(&j.admin, j.contest, app.user_id("jan").await).await;

        let sum = server::services::rating::rating_sum(&app.db, j.submission).await.unwrap();
        assert_eq!(sum, None);

        rate(&app, &j.judge, j.submission, 2).await;
        rate(&app, &second, j.submission, 4).await;

        let sum = server::services::rating::rating_sum(&app.db, j.submission).await.unwrap();
        assert_eq!(sum, Some(6));
    }

    #[tokio::test]
    async fn non_judge_cannot_rate() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;

        let res = rate(&app, &j.entrant, j.submission, 5).await;

        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "NOT_AUTHORIZED");
    }

    #[tokio::test]
    async fn unpaid_submission_cannot_be_rated() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        let author = app.create_author(&j.entrant).await;
        let photo = app.upload_photo(&j.entrant).await;
        let unpaid = app.submit(&j.entrant, author, j.theme, &[photo]).await;
        let unpaid_id = unpaid.body["submissions"][0]["id"].as_i64().unwrap() as i32;

        let res = rate(&app, &j.judge, unpaid_id, 5).await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(routes::JUDGE_SUBMISSIONS, &j.judge).await;
        assert_eq!(res.body["total"], 1);
        assert_eq!(res.body["data"][0]["id"], j.submission);
        assert!(res.body["data"][0]["author"]["email"].is_null());
    }

    #[tokio::test]
    async fn revoked_payment_withdraws_submission_from_judging() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        let set = app.get_with_token(routes::SUBMISSION_SETS, &j.entrant).await;
        let set_id = set.body["data"][0]["id"].as_i64().unwrap() as i32;

        let res = app
            .put_with_token(&routes::payment(set_id), &json!({"paid": false}), &j.admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = rate(&app, &j.judge, j.submission, 5).await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(routes::JUDGE_SUBMISSIONS, &j.judge).await;
        assert_eq!(res.body["total"], 0);

        let res = app.get_with_token(routes::JUDGE_CONTESTS, &j.judge).await;
        assert_eq!(res.body["data"][0]["themes"][0]["submissions_number"], 0);
    }

    #[tokio::test]
    async fn published_contest_cannot_be_rated() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        app.publish_contest(&j.admin, j.contest).await;

        let res = rate(&app, &j.judge, j.submission, 5).await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(routes::JUDGE_CONTESTS, &j.judge).await;
        assert_eq!(res.body["total"], 0);
    }

    #[tokio::test]
    async fn judge_contests_count_progress() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;

        let res = app.get_with_token(routes::JUDGE_CONTESTS, &j.judge).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["total"], 1);
        let theme = &res.body["data"][0]["themes"][0];
        assert_eq!(theme["id"], j.theme);
        assert_eq!(theme["submissions_number"], 1);
        assert_eq!(theme["ratings_number"], 0);

        rate(&app, &j.judge, j.submission, 4).await;

        let res = app.get_with_token(routes::JUDGE_CONTESTS, &j.judge).await;
        assert_eq!(res.body["data"][0]["themes"][0]["ratings_number"], 1);

        let res = app.get_with_token(routes::JUDGE_CONTESTS, &j.entrant).await;
        assert_eq!(res.body["total"], 0);
    }
}

mod results {
    use super::*;

    #[tokio::test]
    async fn results_are_hidden_before_publish() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        rate(&app, &j.judge, j.submission, 3).await;
        set_threshold(&app, &j.admin, j.theme, 3).await;

        let res = app.get_with_token(&routes::theme_results(j.theme), &j.admin).await;
        assert_eq!(res.status, 404);

        let res = app.get_without_token(&routes::submission_result(j.submission)).await;
        assert_eq!(res.status, 404);

        let res = app.get_without_token(routes::SUBMISSION_RESULTS).await;
        assert_eq!(res.body["total"], 0);
    }

    #[tokio::test]
    async fn submission_reaching_threshold_is_accepted() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        rate(&app, &j.judge, j.submission, 5).await;
        rate(&app, &j.judge, j.submission, 3).await;
        set_threshold(&app, &j.admin, j.theme, 3).await;
        app.publish_contest(&j.admin, j.contest).await;

        let res = app.get_without_token(&routes::theme_results(j.theme)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["accepted_threshold"], 3);
        let result = &res.body["submissions"][0];
        assert_eq!(result["id"], j.submission);
        assert_eq!(result["accepted"], true);
        assert_eq!(result["rating"], 3);
        assert_eq!(result["media"][0]["id"], j.photo);

        let res = app.get_without_token(&routes::submission_result(j.submission)).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["accepted"], true);

        let (status, _, _) = app.get_bytes(&routes::media_file(j.photo), None).await;
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn submission_below_threshold_is_withheld() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        rate(&app, &j.judge, j.submission, 3).await;
        set_threshold(&app, &j.admin, j.theme, 4).await;
        app.publish_contest(&j.admin, j.contest).await;

        let res = app.get_without_token(&routes::theme_results(j.theme)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let result = &res.body["submissions"][0];
        assert_eq!(result["accepted"], false);
        assert_eq!(result["rating"], 3);
        assert!(result["media"].is_null());

        let res = app.get_without_token(&routes::submission_result(j.submission)).await;
        assert_eq!(res.status, 404);

        let res = app.get_without_token(routes::SUBMISSION_RESULTS).await;
        assert_eq!(res.body["total"], 0);

        let (status, _, _) = app.get_bytes(&routes::media_file(j.photo), None).await;
        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn theme_without_threshold_accepts_nothing() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        rate(&app, &j.judge, j.submission, 5).await;
        app.publish_contest(&j.admin, j.contest).await;

        let res = app.get_without_token(&routes::theme_results(j.theme)).await;
        assert_eq!(res.status, 200);
        assert!(res.body["accepted_threshold"].is_null());
        assert_eq!(res.body["submissions"][0]["accepted"], false);
    }

    #[tokio::test]
    async fn accepted_submissions_are_ordered_by_rating() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        let author = app.create_author(&j.entrant).await;
        let photo = app.upload_photo(&j.entrant).await;
        let set = app.submit(&j.entrant, author, j.theme, &[photo]).await;
        let second = set.body["submissions"][0]["id"].as_i64().unwrap() as i32;
        app.put_with_token(&routes::payment(set.id()), &json!({"paid": true}), &j.admin)
            .await;

        rate(&app, &j.judge, j.submission, 2).await;
        rate(&app, &j.judge, second, 5).await;
        set_threshold(&app, &j.admin, j.theme, 1).await;
        app.publish_contest(&j.admin, j.contest).await;

        let res = app.get_without_token(routes::SUBMISSION_RESULTS).await;
        assert_eq!(res.body["total"], 2);
        assert_eq!(res.body["data"][0]["id"], second);
        assert_eq!(res.body["data"][1]["id"], j.submission);

        let res = app
            .get_without_token(&format!("{}?ordering=rating", routes::SUBMISSION_RESULTS))
            .await;
        assert_eq!(res.body["data"][0]["id"], j.submission);

        let res = app
            .get_without_token(&format!("{}?ordering=title", routes::SUBMISSION_RESULTS))
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["field"], "ordering");
    }

    #[tokio::test]
    async fn rewards_appear_in_results() {
        let app = TestApp::spawn().await;
        let j = judged(&app).await;
        rate(&app, &j.judge, j.submission, 5).await;
        set_threshold(&app, &j.admin, j.theme, 1).await;

        let res = app
            .put_with_token(
                &routes::submission_reward(j.submission),
                &json!({"kind": 1, "label": "Salon gold medal"}),
                &j.admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .put_with_token(
                &routes::submission_reward(j.submission),
                &json!({"kind": 9, "label": "Unknown"}),
                &j.admin,
            )
            .await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["field"], "kind");

        app.publish_contest(&j.admin, j.contest).await;

        let res = app.get_without_token(&routes::submission_result(j.submission)).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["reward_kind"], "Gold");
        assert_eq!(res.body["reward_label"], "Salon gold medal");
    }
}

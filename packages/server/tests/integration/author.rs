use serde_json::json;

use crate::common::{TestApp, routes};

#[tokio::test]
async fn authors_are_private_to_their_creator() {
    let app = TestApp::spawn().await;
    let ana = app.create_authenticated_user("ana").await;
    let bor = app.create_authenticated_user("bor").await;
    let author = app.create_author(&ana).await;

    let res = app.get_with_token(&routes::author(author), &bor).await;
    assert_eq!(res.status, 404);

    let res = app.get_with_token(routes::AUTHORS, &bor).await;
    assert_eq!(res.body["total"], 0);

    let res = app.get_with_token(routes::AUTHORS, &ana).await;
    assert_eq!(res.body["total"], 1);
}

#[tokio::test]
async fn email_is_only_shown_to_admins() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let ana = app.create_authenticated_user("ana").await;
    let author = app.create_author(&ana).await;

    let res = app.get_with_token(&routes::author(author), &ana).await;
    assert_eq!(res.status, 200);
    assert!(res.body["email"].is_null());

    let res = app.get_with_token(&routes::author(author), &admin).await;
    assert_eq!(res.body["email"], "ana@example.com");
}

#[tokio::test]
async fn patch_can_clear_optional_fields() {
    let app = TestApp::spawn().await;
    let ana = app.create_authenticated_user("ana").await;
    let res = app
        .post_with_token(
            routes::AUTHORS,
            &json!({"first_name": "Ana", "last_name": "Novak", "club": "FD Ljubljana"}),
            &ana,
        )
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    let author = res.id();
    assert_eq!(res.body["club"], "FD Ljubljana");

    let res = app
        .patch_with_token(&routes::author(author), &json!({"club": null}), &ana)
        .await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert!(res.body["club"].is_null());
    assert_eq!(res.body["first_name"], "Ana");
}

#[tokio::test]
async fn first_name_is_required() {
    let app = TestApp::spawn().await;
    let ana = app.create_authenticated_user("ana").await;

    let res = app
        .post_with_token(
            routes::AUTHORS,
            &json!({"first_name": " ", "last_name": "Novak"}),
            &ana,
        )
        .await;

    assert_eq!(res.status, 400);
    assert_eq!(res.body["field"], "first_name");
}

#[tokio::test]
async fn author_with_submissions_cannot_be_deleted() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let contest = app.create_open_contest(&admin, "Salon").await;
    let theme = app.create_theme(&admin, contest, 1).await;
    let ana = app.create_authenticated_user("ana").await;
    let author = app.create_author(&ana).await;
    let photo = app.upload_photo(&ana).await;
    app.submit(&ana, author, theme, &[photo]).await;

    let res = app.delete_with_token(&routes::author(author), &ana).await;

    assert_eq!(res.status, 409);
}

#[tokio::test]
async fn admin_awards_an_author_for_a_theme() {
    let app = TestApp::spawn().await;
    let admin = app.admin_token().await;
    let contest = app.create_open_contest(&admin, "Salon").await;
    let theme = app.create_theme(&admin, contest, 1).await;
    let ana = app.create_authenticated_user("ana").await;
    let author = app.create_author(&ana).await;

    let body = json!({"theme_id": theme, "label": "Best young author"});
    let res = app.put_with_token(&routes::author_reward(author), &body, &ana).await;
    assert_eq!(res.status, 403);

    let res = app
        .put_with_token(&routes::author_reward(author), &body, &admin)
        .await;
    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["label"], "Best young author");

    let res = app.delete_with_token(&routes::author_reward(author), &admin).await;
    assert_eq!(res.status, 204);
    let res = app.delete_with_token(&routes::author_reward(author), &admin).await;
    assert_eq!(res.status, 404);
}

use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/contests", contest_routes())
        .nest("/themes", theme_routes())
        .nest("/authors", author_routes())
        .nest("/media", media_routes(config))
        .nest("/submissions", submission_routes())
        .nest("/submission-sets", submission_set_routes())
        .nest("/payments", payment_routes())
        .nest("/ratings", rating_routes())
        .nest("/judge", judge_routes())
        .nest("/results", results_routes())
        .nest("/backup", backup_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn contest_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::contest::list_contests,
            handlers::contest::create_contest
        ))
        .routes(routes!(
            handlers::contest::get_contest,
            handlers::contest::update_contest,
            handlers::contest::delete_contest
        ))
        .routes(routes!(
            handlers::theme::list_themes,
            handlers::theme::create_theme
        ))
        .routes(routes!(
            handlers::contest::list_judges,
            handlers::contest::add_judge
        ))
        .routes(routes!(handlers::contest::remove_judge))
}

fn theme_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::theme::get_theme,
            handlers::theme::update_theme,
            handlers::theme::delete_theme
        ))
        .routes(routes!(
            handlers::theme::get_theme_results_config,
            handlers::theme::set_theme_results_config
        ))
}

fn author_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::author::list_authors,
            handlers::author::create_author
        ))
        .routes(routes!(
            handlers::author::get_author,
            handlers::author::update_author,
            handlers::author::delete_author
        ))
        .routes(routes!(
            handlers::author::set_author_reward,
            handlers::author::delete_author_reward
        ))
}

fn media_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(
            handlers::media::list_media,
            handlers::media::upload_media
        ))
        .layer(handlers::media::upload_body_limit(&config.media));

    let read = OpenApiRouter::new()
        .routes(routes!(
            handlers::media::get_media,
            handlers::media::delete_media
        ))
        .routes(routes!(handlers::media::download_media))
        .routes(routes!(handlers::media::download_thumbnail));

    upload.merge(read)
}

fn submission_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::submission::list_submissions,
            handlers::submission::create_submissions
        ))
        .routes(routes!(
            handlers::submission::get_submission,
            handlers::submission::delete_submission
        ))
        .routes(routes!(
            handlers::submission::set_submission_reward,
            handlers::submission::delete_submission_reward
        ))
}

fn submission_set_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::submission_set::list_submission_sets))
        .routes(routes!(
            handlers::submission_set::get_submission_set,
            handlers::submission_set::delete_submission_set
        ))
}

fn payment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::payment::list_payments))
        .routes(routes!(handlers::payment::set_paid))
}

fn rating_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(
        handlers::rating::list_ratings,
        handlers::rating::rate
    ))
}

fn judge_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::judge::judge_contests))
        .routes(routes!(handlers::judge::judge_submissions))
}

fn results_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::results::theme_results))
        .routes(routes!(handlers::results::submission_results))
        .routes(routes!(handlers::results::submission_result))
}

fn backup_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::backup::trigger_sweep))
}

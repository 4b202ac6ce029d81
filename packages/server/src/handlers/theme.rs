use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{info, instrument};

use super::contest::theme_responses;
use crate::entity::{author_reward, submission, theme, theme_results};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::contest::*;
use crate::models::shared::validate_title;
use crate::state::AppState;
use crate::utils::contest::{find_contest, find_theme};

async fn theme_response(
    state: &AppState,
    model: theme::Model,
) -> Result<ThemeResponse, AppError> {
    theme_responses(&state.db, vec![model])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound("Theme not found".into()))
}

#[utoipa::path(
    get,
    path = "/{id}/themes",
    tag = "Themes",
    operation_id = "listThemes",
    summary = "List themes of a contest",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Themes", body = Vec<ThemeResponse>),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(contest_id = %id))]
pub async fn list_themes(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<ThemeResponse>>, AppError> {
    find_contest(&state.db, id).await?;
    let themes = theme::Entity::find()
        .filter(theme::Column::ContestId.eq(id))
        .order_by_asc(theme::Column::Id)
        .all(&state.db)
        .await?;
    Ok(Json(theme_responses(&state.db, themes).await?))
}

#[utoipa::path(
    post,
    path = "/{id}/themes",
    tag = "Themes",
    operation_id = "createTheme",
    summary = "Add a theme to a contest",
    description = "Requires `contest:manage`. The theme is owned by the contest's owner.",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = CreateThemeRequest,
    responses(
        (status = 201, description = "Theme created", body = ThemeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id = %id))]
pub async fn create_theme(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<CreateThemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;
    validate_create_theme(&payload)?;
    let contest = find_contest(&state.db, id).await?;

    let model = theme::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        is_series: Set(payload.is_series),
        n_photos: Set(payload.n_photos),
        contest_id: Set(contest.id),
        user_id: Set(contest.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(theme_id = model.id, "Theme created");
    Ok((StatusCode::CREATED, Json(ThemeResponse::new(model, 0))))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Themes",
    operation_id = "getTheme",
    summary = "Get a theme",
    params(("id" = i32, Path, description = "Theme ID")),
    responses(
        (status = 200, description = "Theme", body = ThemeResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(theme_id = %id))]
pub async fn get_theme(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ThemeResponse>, AppError> {
    let model = find_theme(&state.db, id).await?;
    Ok(Json(theme_response(&state, model).await?))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Themes",
    operation_id = "updateTheme",
    summary = "Update a theme",
    description = "Requires `contest:manage`.",
    params(("id" = i32, Path, description = "Theme ID")),
    request_body = UpdateThemeRequest,
    responses(
        (status = 200, description = "Theme updated", body = ThemeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(theme_id = %id))]
pub async fn update_theme(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateThemeRequest>,
) -> Result<Json<ThemeResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;
    let existing = find_theme(&state.db, id).await?;

    let mut active: theme::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        validate_title(&title)?;
        active.title = Set(title.trim().to_string());
    }
    if let Some(n_photos) = payload.n_photos {
        validate_n_photos(n_photos)?;
        active.n_photos = Set(n_photos);
    }
    if let Some(is_series) = payload.is_series {
        active.is_series = Set(is_series);
    }
    let model = active.update(&state.db).await?;

    Ok(Json(theme_response(&state, model).await?))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Themes",
    operation_id = "deleteTheme",
    summary = "Delete a theme",
    description = "Requires `contest:manage`. Themes with submissions are protected.",
    params(("id" = i32, Path, description = "Theme ID")),
    responses(
        (status = 204, description = "Theme deleted"),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Theme has submissions (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(theme_id = %id))]
pub async fn delete_theme(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("contest:manage")?;
    let theme = find_theme(&state.db, id).await?;

    let submissions = submission::Entity::find()
        .filter(submission::Column::ThemeId.eq(theme.id))
        .count(&state.db)
        .await?;
    if submissions > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a theme that has submissions".into(),
        ));
    }

    let txn = state.db.begin().await?;
    theme_results::Entity::delete_many()
        .filter(theme_results::Column::ThemeId.eq(theme.id))
        .exec(&txn)
        .await?;
    author_reward::Entity::delete_many()
        .filter(author_reward::Column::ThemeId.eq(theme.id))
        .exec(&txn)
        .await?;
    theme::Entity::delete_by_id(theme.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/results",
    tag = "Themes",
    operation_id = "getThemeResultsConfig",
    summary = "Get the acceptance threshold of a theme",
    description = "Requires `results:manage`.",
    params(("id" = i32, Path, description = "Theme ID")),
    responses(
        (status = 200, description = "Threshold", body = ThemeResultsResponse),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not configured (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(theme_id = %id))]
pub async fn get_theme_results_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ThemeResultsResponse>, AppError> {
    auth_user.require_permission("results:manage")?;
    let model = theme_results::Entity::find()
        .filter(theme_results::Column::ThemeId.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Theme results not configured".into()))?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    put,
    path = "/{id}/results",
    tag = "Themes",
    operation_id = "setThemeResultsConfig",
    summary = "Set the acceptance threshold of a theme",
    description = "Requires `results:manage`. Replaces any previous threshold.",
    params(("id" = i32, Path, description = "Theme ID")),
    request_body = ThemeResultsRequest,
    responses(
        (status = 200, description = "Threshold saved", body = ThemeResultsResponse),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(theme_id = %id))]
pub async fn set_theme_results_config(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<ThemeResultsRequest>,
) -> Result<Json<ThemeResultsResponse>, AppError> {
    auth_user.require_permission("results:manage")?;
    let theme = find_theme(&state.db, id).await?;

    theme_results::Entity::insert(theme_results::ActiveModel {
        theme_id: Set(theme.id),
        accepted_threshold: Set(payload.accepted_threshold),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(theme_results::Column::ThemeId)
            .update_column(theme_results::Column::AcceptedThreshold)
            .to_owned(),
    )
    .exec_without_returning(&state.db)
    .await?;

    Ok(Json(ThemeResultsResponse {
        theme_id: theme.id,
        accepted_threshold: payload.accepted_threshold,
    }))
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{author, author_reward, submission, submission_set};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::author::*;
use crate::models::contest::{AuthorRewardRequest, AuthorRewardResponse};
use crate::models::shared::validate_max_len;
use crate::state::AppState;
use crate::utils::contest::find_theme;

fn sees_all(auth_user: &AuthUser) -> bool {
    auth_user.is_admin() || auth_user.has_permission("author:view_all")
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Authors are private to the user that created them.
async fn find_author<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<author::Model, AppError> {
    let mut select = author::Entity::find_by_id(id);
    if !sees_all(auth_user) {
        select = select.filter(author::Column::UserId.eq(auth_user.user_id));
    }
    select
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Author not found".into()))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Authors",
    operation_id = "createAuthor",
    summary = "Create an author",
    request_body = CreateAuthorRequest,
    responses(
        (status = 201, description = "Author created", body = AuthorResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_author(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateAuthorRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_create_author(&payload)?;

    let model = author::ActiveModel {
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        email: Set(trimmed(payload.email)),
        dob: Set(payload.dob),
        school: Set(trimmed(payload.school)),
        club: Set(trimmed(payload.club)),
        mentor: Set(trimmed(payload.mentor)),
        user_id: Set(auth_user.user_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(author_id = model.id, "Author created");
    Ok((
        StatusCode::CREATED,
        Json(AuthorResponse::new(model, sees_all(&auth_user))),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Authors",
    operation_id = "listAuthors",
    summary = "List the caller's authors",
    description = "Admins see every author.",
    responses(
        (status = 200, description = "Authors", body = AuthorListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_authors(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AuthorListResponse>, AppError> {
    let mut select = author::Entity::find();
    if !sees_all(&auth_user) {
        select = select.filter(author::Column::UserId.eq(auth_user.user_id));
    }
    let show_email = sees_all(&auth_user);
    let data: Vec<AuthorResponse> = select
        .order_by_asc(author::Column::LastName)
        .order_by_asc(author::Column::FirstName)
        .all(&state.db)
        .await?
        .into_iter()
        .map(|a| AuthorResponse::new(a, show_email))
        .collect();

    Ok(Json(AuthorListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Authors",
    operation_id = "getAuthor",
    summary = "Get an author",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 200, description = "Author", body = AuthorResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(author_id = %id))]
pub async fn get_author(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AuthorResponse>, AppError> {
    let model = find_author(&state.db, &auth_user, id).await?;
    Ok(Json(AuthorResponse::new(model, sees_all(&auth_user))))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Authors",
    operation_id = "updateAuthor",
    summary = "Update an author",
    params(("id" = i32, Path, description = "Author ID")),
    request_body = UpdateAuthorRequest,
    responses(
        (status = 200, description = "Author updated", body = AuthorResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(author_id = %id))]
pub async fn update_author(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateAuthorRequest>,
) -> Result<Json<AuthorResponse>, AppError> {
    validate_update_author(&payload)?;
    let existing = find_author(&state.db, &auth_user, id).await?;

    let mut active: author::ActiveModel = existing.into();
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name.trim().to_string());
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name.trim().to_string());
    }
    if let Some(email) = payload.email {
        active.email = Set(trimmed(email));
    }
    if let Some(dob) = payload.dob {
        active.dob = Set(dob);
    }
    if let Some(school) = payload.school {
        active.school = Set(trimmed(school));
    }
    if let Some(club) = payload.club {
        active.club = Set(trimmed(club));
    }
    if let Some(mentor) = payload.mentor {
        active.mentor = Set(trimmed(mentor));
    }
    let model = active.update(&state.db).await?;

    Ok(Json(AuthorResponse::new(model, sees_all(&auth_user))))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Authors",
    operation_id = "deleteAuthor",
    summary = "Delete an author",
    description = "Authors with submissions cannot be deleted.",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Author has submissions (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(author_id = %id))]
pub async fn delete_author(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let author = find_author(&state.db, &auth_user, id).await?;

    let submissions = submission::Entity::find()
        .filter(submission::Column::AuthorId.eq(author.id))
        .count(&state.db)
        .await?;
    let sets = submission_set::Entity::find()
        .filter(submission_set::Column::AuthorId.eq(author.id))
        .count(&state.db)
        .await?;
    if submissions + sets > 0 {
        return Err(AppError::Conflict(
            "Cannot delete an author that has submissions".into(),
        ));
    }

    let txn = state.db.begin().await?;
    author_reward::Entity::delete_many()
        .filter(author_reward::Column::AuthorId.eq(author.id))
        .exec(&txn)
        .await?;
    author::Entity::delete_by_id(author.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/{id}/reward",
    tag = "Rewards",
    operation_id = "setAuthorReward",
    summary = "Award an author",
    description = "Requires `results:manage`. Replaces any previous author reward.",
    params(("id" = i32, Path, description = "Author ID")),
    request_body = AuthorRewardRequest,
    responses(
        (status = 200, description = "Reward saved", body = AuthorRewardResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(author_id = %id))]
pub async fn set_author_reward(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AuthorRewardRequest>,
) -> Result<Json<AuthorRewardResponse>, AppError> {
    auth_user.require_permission("results:manage")?;
    validate_max_len("label", &payload.label, 100)?;
    let author = find_author(&state.db, &auth_user, id).await?;
    let theme = find_theme(&state.db, payload.theme_id)
        .await
        .map_err(|_| AppError::field("theme_id", "Theme does not exist"))?;

    author_reward::Entity::insert(author_reward::ActiveModel {
        author_id: Set(author.id),
        theme_id: Set(theme.id),
        label: Set(payload.label.clone()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(author_reward::Column::AuthorId)
            .update_columns([author_reward::Column::ThemeId, author_reward::Column::Label])
            .to_owned(),
    )
    .exec_without_returning(&state.db)
    .await?;

    Ok(Json(AuthorRewardResponse {
        author_id: author.id,
        theme_id: theme.id,
        label: payload.label,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}/reward",
    tag = "Rewards",
    operation_id = "deleteAuthorReward",
    summary = "Remove an author's reward",
    description = "Requires `results:manage`.",
    params(("id" = i32, Path, description = "Author ID")),
    responses(
        (status = 204, description = "Reward removed"),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(author_id = %id))]
pub async fn delete_author_reward(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("results:manage")?;
    let result = author_reward::Entity::delete_many()
        .filter(author_reward::Column::AuthorId.eq(id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Reward not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::submission::{SubmissionSetListResponse, SubmissionSetResponse};
use crate::services::submission as workflow;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Submission Sets",
    operation_id = "listSubmissionSets",
    summary = "List the caller's submission sets",
    description = "Admins see every set.",
    responses(
        (status = 200, description = "Submission sets", body = SubmissionSetListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_submission_sets(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionSetListResponse>, AppError> {
    let sets = workflow::list_submission_sets(&state.db, &auth_user).await?;
    let data = workflow::describe_submission_sets(&state.db, sets, auth_user.is_admin()).await?;
    Ok(Json(SubmissionSetListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submission Sets",
    operation_id = "getSubmissionSet",
    summary = "Get a submission set",
    params(("id" = i32, Path, description = "Submission set ID")),
    responses(
        (status = 200, description = "Submission set", body = SubmissionSetResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_set_id = %id))]
pub async fn get_submission_set(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionSetResponse>, AppError> {
    let set = workflow::find_submission_set(&state.db, &auth_user, id).await?;
    workflow::describe_submission_sets(&state.db, vec![set], auth_user.is_admin())
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Submission set not found".into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Submission Sets",
    operation_id = "deleteSubmissionSet",
    summary = "Delete a submission set and its submissions",
    description = "Owner or admin. Owners cannot delete once the contest is published.",
    params(("id" = i32, Path, description = "Submission set ID")),
    responses(
        (status = 204, description = "Submission set deleted"),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_set_id = %id))]
pub async fn delete_submission_set(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    workflow::delete_submission_set(&state, &auth_user, id, chrono::Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

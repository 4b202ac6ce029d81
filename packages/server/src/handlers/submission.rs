use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::instrument;

use crate::entity::{submission, submission_reward};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::contest::{
    SubmissionRewardRequest, SubmissionRewardResponse, validate_submission_reward,
};
use crate::models::submission::*;
use crate::services::submission as workflow;
use crate::state::AppState;

fn show_email(auth_user: Option<&AuthUser>) -> bool {
    auth_user.is_some_and(|u| u.is_admin() || u.has_permission("author:view_all"))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Submissions",
    operation_id = "createSubmissions",
    summary = "Submit photos to a contest",
    description = "Accepts one submission or an array. All submissions must target themes of \
        the same open contest and are stored together with a new submission set.",
    request_body = CreateSubmissionsBody,
    responses(
        (status = 201, description = "Submissions created", body = SubmissionSetResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateSubmissionsBody>,
) -> Result<impl IntoResponse, AppError> {
    let batch =
        workflow::create_submissions(&state, &auth_user, payload.into_vec(), chrono::Utc::now())
            .await?;

    let set = workflow::describe_submission_sets(
        &state.db,
        vec![batch.set],
        show_email(Some(&auth_user)),
    )
    .await?
    .pop()
    .ok_or_else(|| AppError::Internal("created submission set vanished".into()))?;

    Ok((StatusCode::CREATED, Json(set)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Submissions",
    operation_id = "listSubmissions",
    summary = "List visible submissions",
    description = "Owners see their own submissions, judges those of their contests, and \
        everyone those of published contests.",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "Submissions", body = SubmissionListResponse),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_submissions(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let submissions =
        workflow::list_submissions(&state.db, auth_user.as_ref(), &query, chrono::Utc::now())
            .await?;
    let data =
        workflow::describe_submissions(&state.db, submissions, show_email(auth_user.as_ref()))
            .await?;
    Ok(Json(SubmissionListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "getSubmission",
    summary = "Get a submission",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission", body = SubmissionResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn get_submission(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResponse>, AppError> {
    let submission =
        workflow::find_visible_submission(&state.db, auth_user.as_ref(), id, chrono::Utc::now())
            .await?;
    workflow::describe_submissions(&state.db, vec![submission], show_email(auth_user.as_ref()))
        .await?
        .pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Submissions",
    operation_id = "deleteSubmission",
    summary = "Delete own submission",
    description = "Only the submitting user may delete, and only until the contest is published. \
        The submission's photos are deleted with it.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 204, description = "Submission deleted"),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn delete_submission(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    workflow::delete_submission(&state, &auth_user, id, chrono::Utc::now()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/{id}/reward",
    tag = "Rewards",
    operation_id = "setSubmissionReward",
    summary = "Award a submission",
    description = "Requires `results:manage`. Replaces any previous reward.",
    params(("id" = i32, Path, description = "Submission ID")),
    request_body = SubmissionRewardRequest,
    responses(
        (status = 200, description = "Reward saved", body = SubmissionRewardResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(submission_id = %id))]
pub async fn set_submission_reward(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<SubmissionRewardRequest>,
) -> Result<Json<SubmissionRewardResponse>, AppError> {
    auth_user.require_permission("results:manage")?;
    validate_submission_reward(&payload)?;
    submission::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".into()))?;

    submission_reward::Entity::insert(submission_reward::ActiveModel {
        submission_id: Set(id),
        kind: Set(payload.kind),
        label: Set(payload.label.clone()),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::column(submission_reward::Column::SubmissionId)
            .update_columns([
                submission_reward::Column::Kind,
                submission_reward::Column::Label,
            ])
            .to_owned(),
    )
    .exec_without_returning(&state.db)
    .await?;

    let model = submission_reward::Entity::find()
        .filter(submission_reward::Column::SubmissionId.eq(id))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("reward row missing after upsert".into()))?;
    Ok(Json(model.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}/reward",
    tag = "Rewards",
    operation_id = "deleteSubmissionReward",
    summary = "Remove a submission's reward",
    description = "Requires `results:manage`.",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 204, description = "Reward removed"),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn delete_submission_reward(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("results:manage")?;
    let result = submission_reward::Entity::delete_many()
        .filter(submission_reward::Column::SubmissionId.eq(id))
        .exec(&state.db)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Reward not found".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

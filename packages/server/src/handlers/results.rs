use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::results::*;
use crate::services::results;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/themes/{id}",
    tag = "Results",
    operation_id = "themeResults",
    summary = "Results of a theme",
    description = "Available once the contest is published. Photos are only included for \
        accepted submissions.",
    params(("id" = i32, Path, description = "Theme ID")),
    responses(
        (status = 200, description = "Theme results", body = ThemeResultResponse),
        (status = 404, description = "Not found or not published (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(theme_id = %id))]
pub async fn theme_results(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ThemeResultResponse>, AppError> {
    Ok(Json(
        results::theme_results(&state.db, auth_user.as_ref(), id, chrono::Utc::now()).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/submissions",
    tag = "Results",
    operation_id = "submissionResults",
    summary = "Accepted submissions of published contests",
    params(SubmissionResultQuery),
    responses(
        (status = 200, description = "Accepted submissions", body = SubmissionResultListResponse),
        (status = 400, description = "Bad ordering (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn submission_results(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<SubmissionResultQuery>,
) -> Result<Json<SubmissionResultListResponse>, AppError> {
    let data =
        results::submission_results(&state.db, auth_user.as_ref(), &query, chrono::Utc::now())
            .await?;
    Ok(Json(SubmissionResultListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/submissions/{id}",
    tag = "Results",
    operation_id = "submissionResult",
    summary = "Result of one accepted submission",
    params(("id" = i32, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission result", body = SubmissionResultResponse),
        (status = 404, description = "Not found, not published or not accepted (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(submission_id = %id))]
pub async fn submission_result(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<SubmissionResultResponse>, AppError> {
    Ok(Json(
        results::submission_result(&state.db, auth_user.as_ref(), id, chrono::Utc::now()).await?,
    ))
}

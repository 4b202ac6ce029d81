use axum::Json;
use axum::extract::{Query, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::rating::JudgeContestListResponse;
use crate::models::submission::{SubmissionListQuery, SubmissionListResponse};
use crate::services::{rating, submission};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/contests",
    tag = "Judging",
    operation_id = "judgeContests",
    summary = "Contests the caller is judging",
    description = "Unpublished contests only. Each theme counts its paid submissions and the \
        caller's ratings.",
    responses(
        (status = 200, description = "Contests", body = JudgeContestListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn judge_contests(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<JudgeContestListResponse>, AppError> {
    let data = rating::judge_contests(&state.db, &auth_user, chrono::Utc::now()).await?;
    Ok(Json(JudgeContestListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/submissions",
    tag = "Judging",
    operation_id = "judgeSubmissions",
    summary = "Submissions the caller can rate",
    description = "Paid submissions of unpublished contests the caller judges.",
    params(SubmissionListQuery),
    responses(
        (status = 200, description = "Submissions", body = SubmissionListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn judge_submissions(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<SubmissionListQuery>,
) -> Result<Json<SubmissionListResponse>, AppError> {
    let mut submissions =
        rating::ratable_submissions(&state.db, &auth_user, query.theme, chrono::Utc::now())
            .await?;
    if let Some(contest_id) = query.contest {
        let themes = crate::utils::contest::theme_ids_in(&state.db, vec![contest_id]).await?;
        submissions.retain(|s| themes.contains(&s.theme_id));
    }

    let data = submission::describe_submissions(&state.db, submissions, false).await?;
    Ok(Json(SubmissionListResponse {
        total: data.len() as u64,
        data,
    }))
}

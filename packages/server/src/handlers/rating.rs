use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::rating::*;
use crate::services::rating;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Ratings",
    operation_id = "listRatings",
    summary = "List the caller's ratings",
    params(RatingListQuery),
    responses(
        (status = 200, description = "Ratings", body = RatingListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_ratings(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<RatingListQuery>,
) -> Result<Json<RatingListResponse>, AppError> {
    let data: Vec<RatingResponse> = rating::list_ratings(&state.db, &auth_user, &query)
        .await?
        .into_iter()
        .map(RatingResponse::from)
        .collect();
    Ok(Json(RatingListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Ratings",
    operation_id = "rate",
    summary = "Rate a submission",
    description = "The caller must judge the submission's contest. Rating again replaces \
        the previous score.",
    request_body = RateRequest,
    responses(
        (status = 201, description = "Rating saved", body = RatingResponse),
        (status = 403, description = "Not a judge of the contest (NOT_AUTHORIZED)", body = ErrorBody),
        (status = 404, description = "Submission not ratable (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(submission_id = payload.submission))]
pub async fn rate(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let model = rating::rate(
        &state.db,
        &auth_user,
        payload.submission,
        payload.rating,
        chrono::Utc::now(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(RatingResponse::from(model))))
}

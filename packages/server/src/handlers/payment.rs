use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::payment::*;
use crate::services::payment;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/",
    tag = "Payments",
    operation_id = "listPayments",
    summary = "List payments",
    description = "Requires `payment:manage`.",
    params(PaymentListQuery),
    responses(
        (status = 200, description = "Payments", body = PaymentListResponse),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_payments(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<PaymentListResponse>, AppError> {
    let data: Vec<PaymentResponse> = payment::list_payments(&state.db, &auth_user, &query)
        .await?
        .into_iter()
        .map(PaymentResponse::from)
        .collect();
    Ok(Json(PaymentListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    put,
    path = "/{submission_set_id}",
    tag = "Payments",
    operation_id = "setPaid",
    summary = "Mark a submission set paid or unpaid",
    description = "Requires `payment:manage`. Only paid submissions are shown to judges.",
    params(("submission_set_id" = i32, Path, description = "Submission set ID")),
    request_body = SetPaidRequest,
    responses(
        (status = 200, description = "Payment saved", body = PaymentResponse),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(submission_set_id = %submission_set_id))]
pub async fn set_paid(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(submission_set_id): Path<i32>,
    AppJson(payload): AppJson<SetPaidRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    let model = payment::set_paid(&state.db, &auth_user, submission_set_id, payload.paid).await?;
    Ok(Json(model.into()))
}

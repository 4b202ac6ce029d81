use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use common::BackupJob;
use tracing::{info, instrument};

use crate::backup::{fire_and_log, reconcile};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::backup::BackupSweepResponse;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/sweep",
    tag = "Backup",
    operation_id = "triggerBackupSweep",
    summary = "Back up every pending media file",
    description = "Requires `backup:trigger`. Creates missing backup records and enqueues a \
        sweep; uploads happen asynchronously.",
    responses(
        (status = 202, description = "Sweep enqueued", body = BackupSweepResponse),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn trigger_sweep(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("backup:trigger")?;

    let created = reconcile(&state.db).await?;
    let job = BackupJob::sweep();
    let job_id = job.job_id.clone();
    fire_and_log(state.backup_trigger.as_ref(), job).await;

    info!(created, job_id = %job_id, "Backup sweep requested");
    Ok((
        StatusCode::ACCEPTED,
        Json(BackupSweepResponse { created, job_id }),
    ))
}

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::storage::BlobKey;
use sea_orm::*;
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::config::MediaConfig;
use crate::entity::{media_file, submission, theme, theme_results};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::media::{MediaFileResponse, MediaListQuery, MediaListResponse};
use crate::services::MediaIntake;
use crate::services::rating::rating_sum;
use crate::services::results::is_accepted;
use crate::state::AppState;
use crate::utils::contest::{find_judge, theme_contest};

/// Body limit for uploads: the configured file size plus room for the
/// multipart framing. Larger bodies are rejected with the file size message.
pub fn upload_body_limit(config: &MediaConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max((config.max_upload_size as usize).saturating_add(64 * 1024))
}

fn sees_all(auth_user: &AuthUser) -> bool {
    auth_user.is_admin() || auth_user.has_permission("media:view_all")
}

async fn find_own_media<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    id: i32,
) -> Result<media_file::Model, AppError> {
    let mut select = media_file::Entity::find_by_id(id);
    if !sees_all(auth_user) {
        select = select.filter(media_file::Column::UserId.eq(auth_user.user_id));
    }
    select
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Media file not found".into()))
}

/// Whether the caller may download the bytes of a media file.
///
/// Besides the owner, judges of the contest may see linked files, and once
/// the contest is published so may everyone for accepted submissions.
async fn can_download<C: ConnectionTrait>(
    db: &C,
    auth_user: Option<&AuthUser>,
    media: &media_file::Model,
) -> Result<bool, AppError> {
    if auth_user.is_some_and(|u| u.user_id == media.user_id || sees_all(u)) {
        return Ok(true);
    }
    let Some(submission_id) = media.submission_id else {
        return Ok(false);
    };
    let Some(submission) = submission::Entity::find_by_id(submission_id).one(db).await? else {
        return Ok(false);
    };
    let Some(theme) = theme::Entity::find_by_id(submission.theme_id).one(db).await? else {
        return Ok(false);
    };
    let contest = theme_contest(db, &theme).await?;

    if let Some(u) = auth_user
        && find_judge(db, u.user_id, contest.id).await?.is_some()
    {
        return Ok(true);
    }
    if !contest.is_published(chrono::Utc::now()) {
        return Ok(false);
    }

    let threshold = theme_results::Entity::find()
        .filter(theme_results::Column::ThemeId.eq(theme.id))
        .one(db)
        .await?;
    Ok(match threshold {
        Some(t) => is_accepted(rating_sum(db, submission.id).await?, t.accepted_threshold),
        None => false,
    })
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Media",
    operation_id = "uploadMedia",
    summary = "Upload a photo",
    description = "Multipart upload with a `file` field. The photo is validated for size, \
        format and resolution, a thumbnail is generated and a backup is scheduled.",
    request_body(content_type = "multipart/form-data", description = "Photo upload"),
    responses(
        (status = 201, description = "Photo stored", body = MediaFileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn upload_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max = state.config.media.max_upload_size;
    let read_error = |e: axum::extract::multipart::MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::field("file", format!("Max size of file is {max}B"))
        } else {
            AppError::field("file", format!("Multipart error: {e}"))
        }
    };

    let mut data: Option<Vec<u8>> = None;
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() == Some("file") {
            data = Some(field.bytes().await.map_err(read_error)?.to_vec());
            break;
        }
    }
    let data = data.ok_or_else(|| AppError::field("file", "No file was submitted"))?;

    let media = MediaIntake::from_state(&state)
        .store(auth_user.user_id, data)
        .await?;
    Ok((StatusCode::CREATED, Json(MediaFileResponse::from(media))))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Media",
    operation_id = "listMedia",
    summary = "List the caller's photos",
    params(MediaListQuery),
    responses(
        (status = 200, description = "Photos", body = MediaListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<MediaListQuery>,
) -> Result<Json<MediaListResponse>, AppError> {
    let mut select = media_file::Entity::find();
    if !sees_all(&auth_user) {
        select = select.filter(media_file::Column::UserId.eq(auth_user.user_id));
    }
    match query.unlinked {
        Some(true) => select = select.filter(media_file::Column::SubmissionId.is_null()),
        Some(false) => select = select.filter(media_file::Column::SubmissionId.is_not_null()),
        None => {}
    }

    let data: Vec<MediaFileResponse> = select
        .order_by_asc(media_file::Column::Id)
        .all(&state.db)
        .await?
        .into_iter()
        .map(MediaFileResponse::from)
        .collect();
    Ok(Json(MediaListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Media",
    operation_id = "getMedia",
    summary = "Get one of the caller's photos",
    params(("id" = i32, Path, description = "Media file ID")),
    responses(
        (status = 200, description = "Photo", body = MediaFileResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(media_file_id = %id))]
pub async fn get_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<MediaFileResponse>, AppError> {
    let media = find_own_media(&state.db, &auth_user, id).await?;
    Ok(Json(media.into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Media",
    operation_id = "deleteMedia",
    summary = "Delete an unused photo",
    params(("id" = i32, Path, description = "Media file ID")),
    responses(
        (status = 204, description = "Photo deleted"),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Photo belongs to a submission (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(media_file_id = %id))]
pub async fn delete_media(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let media = find_own_media(&state.db, &auth_user, id).await?;
    MediaIntake::from_state(&state).delete(media).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn stream_blob(
    state: &AppState,
    raw_key: &str,
    content_type: &str,
) -> Result<Response, AppError> {
    let key = BlobKey::parse(raw_key)?;
    let size = state.blob_store.size(&key).await?;
    let reader = state.blob_store.get_stream(&key).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, size.to_string())
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

async fn downloadable(
    state: &AppState,
    auth_user: Option<&AuthUser>,
    id: i32,
) -> Result<media_file::Model, AppError> {
    let not_found = || AppError::NotFound("Media file not found".into());
    let media = media_file::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(not_found)?;
    if !can_download(&state.db, auth_user, &media).await? {
        return Err(not_found());
    }
    Ok(media)
}

#[utoipa::path(
    get,
    path = "/{id}/file",
    tag = "Media",
    operation_id = "downloadMedia",
    summary = "Download the original photo",
    params(("id" = i32, Path, description = "Media file ID")),
    responses(
        (status = 200, description = "Photo bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(media_file_id = %id))]
pub async fn download_media(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let media = downloadable(&state, auth_user.as_ref(), id).await?;
    stream_blob(&state, &media.file_key, &media.content_type).await
}

#[utoipa::path(
    get,
    path = "/{id}/thumbnail",
    tag = "Media",
    operation_id = "downloadThumbnail",
    summary = "Download the JPEG thumbnail",
    params(("id" = i32, Path, description = "Media file ID")),
    responses(
        (status = 200, description = "Thumbnail bytes", content_type = "image/jpeg"),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user), fields(media_file_id = %id))]
pub async fn download_thumbnail(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let media = downloadable(&state, auth_user.as_ref(), id).await?;
    stream_blob(&state, &media.thumbnail_key, "image/jpeg").await
}

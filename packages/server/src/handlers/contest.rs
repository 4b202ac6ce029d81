use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use sea_orm::*;
use tracing::{info, instrument};

use crate::entity::{
    author_reward, contest, judge, payment, rating, submission, submission_set, theme,
    theme_results, user,
};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::contest::*;
use crate::state::AppState;
use crate::utils::contest::{find_contest, theme_ids_in};

/// Themes with their submission counts.
pub(crate) async fn theme_responses<C: ConnectionTrait>(
    db: &C,
    themes: Vec<theme::Model>,
) -> Result<Vec<ThemeResponse>, AppError> {
    let counts: HashMap<i32, i64> = submission::Entity::find()
        .select_only()
        .column(submission::Column::ThemeId)
        .column_as(submission::Column::Id.count(), "n")
        .filter(submission::Column::ThemeId.is_in(themes.iter().map(|t| t.id)))
        .group_by(submission::Column::ThemeId)
        .into_tuple::<(i32, i64)>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    Ok(themes
        .into_iter()
        .map(|t| {
            let n = counts.get(&t.id).copied().unwrap_or(0) as u64;
            ThemeResponse::new(t, n)
        })
        .collect())
}

async fn contest_responses<C: ConnectionTrait>(
    db: &C,
    contests: Vec<contest::Model>,
    now: chrono::DateTime<chrono::Utc>,
) -> Result<Vec<ContestResponse>, AppError> {
    let themes = theme::Entity::find()
        .filter(theme::Column::ContestId.is_in(contests.iter().map(|c| c.id)))
        .order_by_asc(theme::Column::Id)
        .all(db)
        .await?;
    let mut by_contest: HashMap<i32, Vec<ThemeResponse>> = HashMap::new();
    for t in theme_responses(db, themes).await? {
        by_contest.entry(t.contest_id).or_default().push(t);
    }

    Ok(contests
        .into_iter()
        .map(|c| {
            let themes = by_contest.remove(&c.id).unwrap_or_default();
            ContestResponse::new(c, themes, now)
        })
        .collect())
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Contests",
    operation_id = "createContest",
    summary = "Create a new contest",
    description = "Requires `contest:manage`. `publish_date` defaults to `end_date`.",
    request_body = CreateContestRequest,
    responses(
        (status = 201, description = "Contest created", body = ContestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(title = %payload.title))]
pub async fn create_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateContestRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("contest:manage")?;
    validate_create_contest(&payload)?;

    let now = chrono::Utc::now();
    let model = contest::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        description: Set(payload.description),
        start_date: Set(payload.start_date),
        end_date: Set(payload.end_date),
        publish_date: Set(payload.publish_date.unwrap_or(payload.end_date)),
        login_required: Set(payload.login_required),
        confirmation_notice: Set(payload.confirmation_notice),
        user_id: Set(auth_user.user_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(contest_id = model.id, "Contest created");
    Ok((
        StatusCode::CREATED,
        Json(ContestResponse::new(model, Vec::new(), now)),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Contests",
    operation_id = "listContests",
    summary = "List contests",
    description = "Public. `submitted` requires authentication.",
    params(ContestListQuery),
    responses(
        (status = 200, description = "List of contests", body = ContestListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_contests(
    auth_user: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<ContestListQuery>,
) -> Result<Json<ContestListResponse>, AppError> {
    let now = chrono::Utc::now();
    let mut select = contest::Entity::find();

    match query.is_active {
        Some(true) => {
            select = select
                .filter(contest::Column::StartDate.lte(now))
                .filter(contest::Column::EndDate.gte(now));
        }
        Some(false) => {
            select = select.filter(
                Condition::any()
                    .add(contest::Column::StartDate.gt(now))
                    .add(contest::Column::EndDate.lt(now)),
            );
        }
        None => {}
    }

    if let Some(submitted) = query.submitted {
        let user = auth_user.as_ref().ok_or(AppError::TokenMissing)?;
        let ids: Vec<i32> = submission_set::Entity::find()
            .filter(submission_set::Column::UserId.eq(user.user_id))
            .select_only()
            .column(submission_set::Column::ContestId)
            .distinct()
            .into_tuple()
            .all(&state.db)
            .await?;
        select = if submitted {
            select.filter(contest::Column::Id.is_in(ids))
        } else {
            select.filter(contest::Column::Id.is_not_in(ids))
        };
    }

    let contests = select
        .order_by_desc(contest::Column::StartDate)
        .all(&state.db)
        .await?;
    let data = contest_responses(&state.db, contests, now).await?;

    Ok(Json(ContestListResponse {
        total: data.len() as u64,
        data,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Contests",
    operation_id = "getContest",
    summary = "Get a contest with its themes",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Contest", body = ContestResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(contest_id = %id))]
pub async fn get_contest(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<ContestResponse>, AppError> {
    let contest = find_contest(&state.db, id).await?;
    let mut data = contest_responses(&state.db, vec![contest], chrono::Utc::now()).await?;
    data.pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Contests",
    operation_id = "updateContest",
    summary = "Update a contest",
    description = "Requires `contest:manage`. Only provided fields change.",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = UpdateContestRequest,
    responses(
        (status = 200, description = "Contest updated", body = ContestResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id = %id))]
pub async fn update_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateContestRequest>,
) -> Result<Json<ContestResponse>, AppError> {
    auth_user.require_permission("contest:manage")?;
    let existing = find_contest(&state.db, id).await?;

    if let Some(title) = &payload.title {
        crate::models::shared::validate_title(title)?;
    }
    let start = payload.start_date.unwrap_or(existing.start_date);
    let end = payload.end_date.unwrap_or(existing.end_date);
    let publish = payload.publish_date.unwrap_or(existing.publish_date);
    validate_dates(start, end, publish)?;

    let now = chrono::Utc::now();
    let mut active: contest::ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(login_required) = payload.login_required {
        active.login_required = Set(login_required);
    }
    if let Some(notice) = payload.confirmation_notice {
        active.confirmation_notice = Set(notice);
    }
    active.start_date = Set(start);
    active.end_date = Set(end);
    active.publish_date = Set(publish);
    active.updated_at = Set(now);
    let model = active.update(&state.db).await?;

    let mut data = contest_responses(&state.db, vec![model], now).await?;
    data.pop()
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Contests",
    operation_id = "deleteContest",
    summary = "Delete a contest and its themes",
    description = "Requires `contest:manage`. Contests with submissions cannot be deleted.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 204, description = "Contest deleted"),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Contest has submissions (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id = %id))]
pub async fn delete_contest(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("contest:manage")?;
    let contest = find_contest(&state.db, id).await?;

    let theme_ids = theme_ids_in(&state.db, vec![contest.id]).await?;
    let submissions = submission::Entity::find()
        .filter(submission::Column::ThemeId.is_in(theme_ids.clone()))
        .count(&state.db)
        .await?;
    if submissions > 0 {
        return Err(AppError::Conflict(
            "Cannot delete a contest that has submissions".into(),
        ));
    }

    let txn = state.db.begin().await?;
    let set_ids: Vec<i32> = submission_set::Entity::find()
        .filter(submission_set::Column::ContestId.eq(contest.id))
        .select_only()
        .column(submission_set::Column::Id)
        .into_tuple()
        .all(&txn)
        .await?;
    payment::Entity::delete_many()
        .filter(payment::Column::SubmissionSetId.is_in(set_ids.clone()))
        .exec(&txn)
        .await?;
    submission_set::Entity::delete_many()
        .filter(submission_set::Column::Id.is_in(set_ids))
        .exec(&txn)
        .await?;
    theme_results::Entity::delete_many()
        .filter(theme_results::Column::ThemeId.is_in(theme_ids.clone()))
        .exec(&txn)
        .await?;
    author_reward::Entity::delete_many()
        .filter(author_reward::Column::ThemeId.is_in(theme_ids))
        .exec(&txn)
        .await?;
    theme::Entity::delete_many()
        .filter(theme::Column::ContestId.eq(contest.id))
        .exec(&txn)
        .await?;
    judge::Entity::delete_many()
        .filter(judge::Column::ContestId.eq(contest.id))
        .exec(&txn)
        .await?;
    contest::Entity::delete_by_id(contest.id).exec(&txn).await?;
    txn.commit().await?;

    info!("Contest deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/judges",
    tag = "Judges",
    operation_id = "listJudges",
    summary = "List judges of a contest",
    description = "Requires `judge:manage`.",
    params(("id" = i32, Path, description = "Contest ID")),
    responses(
        (status = 200, description = "Judges", body = Vec<JudgeResponse>),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id = %id))]
pub async fn list_judges(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<JudgeResponse>>, AppError> {
    auth_user.require_permission("judge:manage")?;
    find_contest(&state.db, id).await?;

    let judges = judge::Entity::find()
        .filter(judge::Column::ContestId.eq(id))
        .order_by_asc(judge::Column::Id)
        .all(&state.db)
        .await?;
    let names: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(judges.iter().map(|j| j.user_id)))
        .all(&state.db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.username))
        .collect();

    Ok(Json(
        judges
            .into_iter()
            .map(|j| {
                let username = names.get(&j.user_id).cloned().unwrap_or_default();
                JudgeResponse::new(j, username)
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/{id}/judges",
    tag = "Judges",
    operation_id = "addJudge",
    summary = "Assign a judge to a contest",
    description = "Requires `judge:manage`.",
    params(("id" = i32, Path, description = "Contest ID")),
    request_body = AddJudgeRequest,
    responses(
        (status = 201, description = "Judge assigned", body = JudgeResponse),
        (status = 400, description = "Unknown user (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Already a judge (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(contest_id = %id, judge_user_id = payload.user_id))]
pub async fn add_judge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<AddJudgeRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("judge:manage")?;
    find_contest(&state.db, id).await?;

    let judge_user = user::Entity::find_by_id(payload.user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::field("user_id", "User does not exist"))?;

    let model = judge::ActiveModel {
        contest_id: Set(id),
        user_id: Set(judge_user.id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::Conflict("User is already a judge of this contest".into())
        }
        _ => AppError::from(e),
    })?;

    info!("Judge assigned");
    Ok((
        StatusCode::CREATED,
        Json(JudgeResponse::new(model, judge_user.username)),
    ))
}

#[utoipa::path(
    delete,
    path = "/{id}/judges/{user_id}",
    tag = "Judges",
    operation_id = "removeJudge",
    summary = "Remove a judge and their ratings",
    description = "Requires `judge:manage`.",
    params(
        ("id" = i32, Path, description = "Contest ID"),
        ("user_id" = i32, Path, description = "Judge's user ID"),
    ),
    responses(
        (status = 204, description = "Judge removed"),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(contest_id = %id))]
pub async fn remove_judge(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path((id, user_id)): Path<(i32, i32)>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission("judge:manage")?;

    let judge = crate::utils::contest::find_judge(&state.db, user_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Judge not found".into()))?;

    let txn = state.db.begin().await?;
    rating::Entity::delete_many()
        .filter(rating::Column::JudgeId.eq(judge.id))
        .exec(&txn)
        .await?;
    judge::Entity::delete_by_id(judge.id).exec(&txn).await?;
    txn.commit().await?;

    Ok(StatusCode::NO_CONTENT)
}

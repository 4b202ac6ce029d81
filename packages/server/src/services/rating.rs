use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::{info, instrument};

use super::payment::{is_paid, paid_submissions};
use crate::entity::{contest, judge, rating, submission, theme};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::contest::ThemeResponse;
use crate::models::rating::{JudgeContestResponse, JudgeThemeResponse, RatingListQuery};
use crate::utils::contest::{find_judge, theme_contest};

/// Contests the user judges that are still being rated at `now`.
async fn open_judged_contests<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    now: DateTime<Utc>,
) -> Result<Vec<contest::Model>, AppError> {
    let contest_ids: Vec<i32> = judge::Entity::find()
        .filter(judge::Column::UserId.eq(user_id))
        .select_only()
        .column(judge::Column::ContestId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(contest::Entity::find()
        .filter(contest::Column::Id.is_in(contest_ids))
        .filter(contest::Column::PublishDate.gte(now))
        .order_by_asc(contest::Column::Id)
        .all(db)
        .await?)
}

/// Paid submissions in unpublished contests judged by the user.
pub async fn ratable_submissions<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    theme_id: Option<i32>,
    now: DateTime<Utc>,
) -> Result<Vec<submission::Model>, AppError> {
    let contest_ids: Vec<i32> = open_judged_contests(db, auth_user.user_id, now)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let mut themes = theme::Entity::find().filter(theme::Column::ContestId.is_in(contest_ids));
    if let Some(theme_id) = theme_id {
        themes = themes.filter(theme::Column::Id.eq(theme_id));
    }
    let theme_ids: Vec<i32> = themes
        .select_only()
        .column(theme::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    Ok(submission::Entity::find()
        .filter(submission::Column::ThemeId.is_in(theme_ids))
        .filter(submission::Column::Id.in_subquery(paid_submissions()))
        .order_by_asc(submission::Column::Id)
        .all(db)
        .await?)
}

/// Contests the user judges, with per-theme progress counters.
pub async fn judge_contests<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    now: DateTime<Utc>,
) -> Result<Vec<JudgeContestResponse>, AppError> {
    let contests = open_judged_contests(db, auth_user.user_id, now).await?;
    let themes = theme::Entity::find()
        .filter(theme::Column::ContestId.is_in(contests.iter().map(|c| c.id)))
        .order_by_asc(theme::Column::Id)
        .all(db)
        .await?;

    let submissions: Vec<(i32, i32)> = submission::Entity::find()
        .filter(submission::Column::ThemeId.is_in(themes.iter().map(|t| t.id)))
        .select_only()
        .column(submission::Column::Id)
        .column(submission::Column::ThemeId)
        .into_tuple()
        .all(db)
        .await?;
    let paid: HashSet<i32> = submission::Entity::find()
        .filter(submission::Column::Id.is_in(submissions.iter().map(|(id, _)| *id)))
        .filter(submission::Column::Id.in_subquery(paid_submissions()))
        .select_only()
        .column(submission::Column::Id)
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();
    let rated: HashSet<i32> = rating::Entity::find()
        .filter(rating::Column::UserId.eq(auth_user.user_id))
        .filter(rating::Column::SubmissionId.is_in(submissions.iter().map(|(id, _)| *id)))
        .select_only()
        .column(rating::Column::SubmissionId)
        .into_tuple::<i32>()
        .all(db)
        .await?
        .into_iter()
        .collect();

    let mut counters: HashMap<i32, (u64, u64)> = HashMap::new();
    for (id, theme_id) in submissions {
        let entry = counters.entry(theme_id).or_default();
        if paid.contains(&id) {
            entry.0 += 1;
        }
        if rated.contains(&id) {
            entry.1 += 1;
        }
    }

    let mut by_contest: HashMap<i32, Vec<JudgeThemeResponse>> = HashMap::new();
    for t in themes {
        let (submissions_number, ratings_number) = counters.get(&t.id).copied().unwrap_or_default();
        by_contest
            .entry(t.contest_id)
            .or_default()
            .push(JudgeThemeResponse {
                theme: ThemeResponse::new(t, submissions_number),
                ratings_number,
            });
    }

    Ok(contests
        .into_iter()
        .map(|c| {
            let themes = by_contest.remove(&c.id).unwrap_or_default();
            JudgeContestResponse::new(c, themes)
        })
        .collect())
}

/// Record the judge's score for a submission, replacing an earlier one.
#[instrument(skip(db, auth_user), fields(user_id = auth_user.user_id))]
pub async fn rate<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    submission_id: i32,
    score: i32,
    now: DateTime<Utc>,
) -> Result<rating::Model, AppError> {
    let not_found = || AppError::NotFound("Submission not found".into());

    let submission = submission::Entity::find_by_id(submission_id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    let theme = theme::Entity::find_by_id(submission.theme_id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    let contest = theme_contest(db, &theme).await?;

    let Some(judge) = find_judge(db, auth_user.user_id, contest.id).await? else {
        return Err(AppError::NotAuthorized(
            "You don't have permission to rate this contest.".into(),
        ));
    };

    if contest.publish_date < now || !is_paid(db, submission.id).await? {
        return Err(not_found());
    }

    rating::Entity::insert(rating::ActiveModel {
        judge_id: Set(judge.id),
        submission_id: Set(submission.id),
        user_id: Set(auth_user.user_id),
        rating: Set(score),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    })
    .on_conflict(
        OnConflict::columns([rating::Column::JudgeId, rating::Column::SubmissionId])
            .update_columns([rating::Column::Rating, rating::Column::UpdatedAt])
            .to_owned(),
    )
    .exec_without_returning(db)
    .await?;

    info!(submission_id, judge_id = judge.id, score, "Rating recorded");

    rating::Entity::find()
        .filter(rating::Column::JudgeId.eq(judge.id))
        .filter(rating::Column::SubmissionId.eq(submission.id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("rating row missing after upsert".into()))
}

/// The caller's own ratings.
pub async fn list_ratings<C: ConnectionTrait>(
    db: &C,
    auth_user: &AuthUser,
    query: &RatingListQuery,
) -> Result<Vec<rating::Model>, AppError> {
    let mut select = rating::Entity::find().filter(rating::Column::UserId.eq(auth_user.user_id));
    if let Some(submission_id) = query.submission {
        select = select.filter(rating::Column::SubmissionId.eq(submission_id));
    }
    if let Some(theme_id) = query.theme {
        let ids: Vec<i32> = submission::Entity::find()
            .filter(submission::Column::ThemeId.eq(theme_id))
            .select_only()
            .column(submission::Column::Id)
            .into_tuple()
            .all(db)
            .await?;
        select = select.filter(rating::Column::SubmissionId.is_in(ids));
    }
    Ok(select.order_by_asc(rating::Column::Id).all(db).await?)
}

/// Summed ratings per submission in one grouped query. Unrated submissions
/// are absent from the map.
pub async fn rating_sums<C: ConnectionTrait>(
    db: &C,
    submission_ids: Vec<i32>,
) -> Result<HashMap<i32, i64>, DbErr> {
    if submission_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, Option<i64>)> = rating::Entity::find()
        .select_only()
        .column(rating::Column::SubmissionId)
        .column_as(rating::Column::Rating.sum(), "total")
        .filter(rating::Column::SubmissionId.is_in(submission_ids))
        .group_by(rating::Column::SubmissionId)
        .into_tuple()
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(id, total)| total.map(|t| (id, t)))
        .collect())
}

/// Sum of all ratings of one submission, `None` when unrated.
pub async fn rating_sum<C: ConnectionTrait>(
    db: &C,
    submission_id: i32,
) -> Result<Option<i64>, DbErr> {
    Ok(rating_sums(db, vec![submission_id])
        .await?
        .get(&submission_id)
        .copied())
}

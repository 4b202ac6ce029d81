use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use sea_orm::*;

use super::rating::rating_sums;
use super::submission::media_by_submission;
use crate::entity::{
    author, author_reward, submission, submission_reward, theme, theme_results,
};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::author::AuthorResponse;
use crate::models::results::{
    AuthorResultResponse, SubmissionResultQuery, SubmissionResultResponse, ThemeResultResponse,
};
use crate::utils::contest::{published_contest_ids, theme_contest, theme_ids_in};

/// A submission is accepted when it has ratings and their sum reaches the
/// theme's threshold.
pub fn is_accepted(rating_sum: Option<i64>, threshold: i32) -> bool {
    rating_sum.is_some_and(|sum| sum >= i64::from(threshold))
}

/// Thresholds per theme. Themes without configured results have none, so
/// nothing in them is accepted.
async fn thresholds<C: ConnectionTrait>(
    db: &C,
    theme_ids: Vec<i32>,
) -> Result<HashMap<i32, i32>, DbErr> {
    Ok(theme_results::Entity::find()
        .filter(theme_results::Column::ThemeId.is_in(theme_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.theme_id, r.accepted_threshold))
        .collect())
}

fn show_email(auth_user: Option<&AuthUser>) -> bool {
    auth_user.is_some_and(|u| u.is_admin() || u.has_permission("author:view_all"))
}

/// Build result rows for submissions with known sums and thresholds.
async fn describe_results<C: ConnectionTrait>(
    db: &C,
    submissions: Vec<submission::Model>,
    sums: &HashMap<i32, i64>,
    thresholds: &HashMap<i32, i32>,
    show_email: bool,
) -> Result<Vec<SubmissionResultResponse>, AppError> {
    let ids: Vec<i32> = submissions.iter().map(|s| s.id).collect();
    let author_ids: HashSet<i32> = submissions.iter().map(|s| s.author_id).collect();

    let authors: HashMap<i32, author::Model> = author::Entity::find()
        .filter(author::Column::Id.is_in(author_ids.iter().copied()))
        .all(db)
        .await?
        .into_iter()
        .map(|a| (a.id, a))
        .collect();
    let author_rewards: HashMap<i32, author_reward::Model> = author_reward::Entity::find()
        .filter(author_reward::Column::AuthorId.is_in(author_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.author_id, r))
        .collect();
    let rewards: HashMap<i32, submission_reward::Model> = submission_reward::Entity::find()
        .filter(submission_reward::Column::SubmissionId.is_in(ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.submission_id, r))
        .collect();

    let accepted: Vec<i32> = submissions
        .iter()
        .filter(|s| {
            thresholds
                .get(&s.theme_id)
                .is_some_and(|&t| is_accepted(sums.get(&s.id).copied(), t))
        })
        .map(|s| s.id)
        .collect();
    let mut media = media_by_submission(db, accepted.clone()).await?;

    submissions
        .into_iter()
        .map(|s| {
            let author = authors
                .get(&s.author_id)
                .cloned()
                .ok_or_else(|| AppError::Internal(format!("submission {} has no author", s.id)))?;
            let author_reward = author_rewards.get(&s.author_id);
            let reward = rewards.get(&s.id);
            let is_accepted = accepted.contains(&s.id);
            Ok(SubmissionResultResponse {
                author: AuthorResultResponse {
                    author: AuthorResponse::new(author, show_email),
                    reward: author_reward.map(|r| r.label.clone()),
                    reward_theme: author_reward.map(|r| r.theme_id),
                },
                accepted: is_accepted,
                rating: sums.get(&s.id).copied(),
                reward_kind: reward
                    .and_then(|r| submission_reward::kind_name(r.kind))
                    .map(str::to_string),
                reward_label: reward.map(|r| r.label.clone()),
                media: is_accepted.then(|| media.remove(&s.id).unwrap_or_default()),
                id: s.id,
                theme_id: s.theme_id,
                title: s.title,
                description: s.description,
                created_at: s.created_at,
            })
        })
        .collect()
}

/// Results of every submission in a theme. Hidden until the contest is
/// published.
pub async fn theme_results<C: ConnectionTrait>(
    db: &C,
    auth_user: Option<&AuthUser>,
    theme_id: i32,
    now: DateTime<Utc>,
) -> Result<ThemeResultResponse, AppError> {
    let not_found = || AppError::NotFound("Theme not found".into());
    let theme = theme::Entity::find_by_id(theme_id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    let contest = theme_contest(db, &theme).await?;
    if !contest.is_published(now) {
        return Err(not_found());
    }

    let thresholds = thresholds(db, vec![theme.id]).await?;
    let submissions = submission::Entity::find()
        .filter(submission::Column::ThemeId.eq(theme.id))
        .order_by_asc(submission::Column::Id)
        .all(db)
        .await?;
    let sums = rating_sums(db, submissions.iter().map(|s| s.id).collect()).await?;
    let submissions =
        describe_results(db, submissions, &sums, &thresholds, show_email(auth_user)).await?;

    Ok(ThemeResultResponse {
        accepted_threshold: thresholds.get(&theme.id).copied(),
        id: theme.id,
        contest_id: theme.contest_id,
        title: theme.title,
        is_series: theme.is_series,
        n_photos: theme.n_photos,
        submissions,
    })
}

/// Accepted submissions of published contests, ordered by rating sum.
pub async fn submission_results<C: ConnectionTrait>(
    db: &C,
    auth_user: Option<&AuthUser>,
    query: &SubmissionResultQuery,
    now: DateTime<Utc>,
) -> Result<Vec<SubmissionResultResponse>, AppError> {
    let ascending = match query.ordering.as_deref() {
        None | Some("-rating") => false,
        Some("rating") => true,
        Some(_) => {
            return Err(AppError::field(
                "ordering",
                "ordering must be one of: rating, -rating",
            ));
        }
    };

    let mut contest_ids = published_contest_ids(db, now).await?;
    if let Some(contest_id) = query.contest {
        contest_ids.retain(|&id| id == contest_id);
    }
    let mut theme_ids = theme_ids_in(db, contest_ids).await?;
    if let Some(theme_id) = query.theme {
        theme_ids.retain(|&id| id == theme_id);
    }

    let thresholds = thresholds(db, theme_ids.clone()).await?;
    let submissions = submission::Entity::find()
        .filter(submission::Column::ThemeId.is_in(theme_ids))
        .all(db)
        .await?;
    let sums = rating_sums(db, submissions.iter().map(|s| s.id).collect()).await?;

    let mut accepted: Vec<submission::Model> = submissions
        .into_iter()
        .filter(|s| {
            thresholds
                .get(&s.theme_id)
                .is_some_and(|&t| is_accepted(sums.get(&s.id).copied(), t))
        })
        .collect();
    if ascending {
        accepted.sort_by_key(|s| (sums.get(&s.id).copied(), s.id));
    } else {
        accepted.sort_by_key(|s| (Reverse(sums.get(&s.id).copied()), s.id));
    }

    describe_results(db, accepted, &sums, &thresholds, show_email(auth_user)).await
}

/// Result of one accepted submission of a published contest.
pub async fn submission_result<C: ConnectionTrait>(
    db: &C,
    auth_user: Option<&AuthUser>,
    id: i32,
    now: DateTime<Utc>,
) -> Result<SubmissionResultResponse, AppError> {
    let not_found = || AppError::NotFound("Submission not found".into());
    let submission = submission::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    let theme = theme::Entity::find_by_id(submission.theme_id)
        .one(db)
        .await?
        .ok_or_else(not_found)?;
    if !theme_contest(db, &theme).await?.is_published(now) {
        return Err(not_found());
    }

    let thresholds = thresholds(db, vec![theme.id]).await?;
    let sums = rating_sums(db, vec![submission.id]).await?;
    let accepted = thresholds
        .get(&theme.id)
        .is_some_and(|&t| is_accepted(sums.get(&submission.id).copied(), t));
    if !accepted {
        return Err(not_found());
    }

    describe_results(db, vec![submission], &sums, &thresholds, show_email(auth_user))
        .await?
        .pop()
        .ok_or_else(not_found)
}

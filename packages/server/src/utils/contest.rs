use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect};

use crate::entity::{contest, judge, theme};
use crate::error::AppError;

/// Look up a contest by ID, returning 404 if not found.
pub async fn find_contest<C: ConnectionTrait>(db: &C, id: i32) -> Result<contest::Model, AppError> {
    contest::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Contest not found".into()))
}

/// Look up a theme by ID, returning 404 if not found.
pub async fn find_theme<C: ConnectionTrait>(db: &C, id: i32) -> Result<theme::Model, AppError> {
    theme::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Theme not found".into()))
}

/// Contest a theme belongs to.
pub async fn theme_contest<C: ConnectionTrait>(
    db: &C,
    theme: &theme::Model,
) -> Result<contest::Model, AppError> {
    contest::Entity::find_by_id(theme.contest_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal(format!("theme {} has no contest", theme.id)))
}

/// Contests whose results are public at `now`.
pub async fn published_contest_ids<C: ConnectionTrait>(
    db: &C,
    now: DateTime<Utc>,
) -> Result<Vec<i32>, AppError> {
    Ok(contest::Entity::find()
        .filter(contest::Column::PublishDate.lte(now))
        .select_only()
        .column(contest::Column::Id)
        .into_tuple()
        .all(db)
        .await?)
}

/// Contests the user is assigned to judge.
pub async fn judged_contest_ids<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
) -> Result<Vec<i32>, AppError> {
    Ok(judge::Entity::find()
        .filter(judge::Column::UserId.eq(user_id))
        .select_only()
        .column(judge::Column::ContestId)
        .into_tuple()
        .all(db)
        .await?)
}

/// Themes of the given contests.
pub async fn theme_ids_in<C: ConnectionTrait>(
    db: &C,
    contest_ids: Vec<i32>,
) -> Result<Vec<i32>, AppError> {
    if contest_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(theme::Entity::find()
        .filter(theme::Column::ContestId.is_in(contest_ids))
        .select_only()
        .column(theme::Column::Id)
        .into_tuple()
        .all(db)
        .await?)
}

/// Judge assignment of `user_id` in `contest_id`, if any.
pub async fn find_judge<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    contest_id: i32,
) -> Result<Option<judge::Model>, AppError> {
    Ok(judge::Entity::find()
        .filter(judge::Column::UserId.eq(user_id))
        .filter(judge::Column::ContestId.eq(contest_id))
        .one(db)
        .await?)
}

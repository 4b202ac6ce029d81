use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::contest::ThemeResponse;
use crate::entity::{contest, rating};

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RateRequest {
    /// Submission being rated.
    pub submission: i32,
    #[schema(example = 4)]
    pub rating: i32,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct RatingListQuery {
    pub submission: Option<i32>,
    pub theme: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RatingResponse {
    pub id: i32,
    pub submission: i32,
    pub judge_id: i32,
    pub rating: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<rating::Model> for RatingResponse {
    fn from(m: rating::Model) -> Self {
        Self {
            id: m.id,
            submission: m.submission_id,
            judge_id: m.judge_id,
            rating: m.rating,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RatingListResponse {
    pub data: Vec<RatingResponse>,
    pub total: u64,
}

/// Theme as seen by a judge: paid submissions and the judge's own progress.
#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeThemeResponse {
    #[serde(flatten)]
    pub theme: ThemeResponse,
    /// Ratings this judge has given in the theme.
    pub ratings_number: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeContestResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub publish_date: DateTime<Utc>,
    pub themes: Vec<JudgeThemeResponse>,
}

impl JudgeContestResponse {
    pub fn new(m: contest::Model, themes: Vec<JudgeThemeResponse>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            description: m.description,
            start_date: m.start_date,
            end_date: m.end_date,
            publish_date: m.publish_date,
            themes,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeContestListResponse {
    pub data: Vec<JudgeContestResponse>,
    pub total: u64,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_max_len, validate_title};
use crate::entity::{contest, judge, theme};
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateContestRequest {
    #[schema(example = "Spring Salon 2026")]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Defaults to `end_date`.
    #[serde(default)]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub login_required: bool,
    /// HTML mailed to submitters after a successful submission.
    #[serde(default)]
    pub confirmation_notice: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateContestRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub publish_date: Option<DateTime<Utc>>,
    pub login_required: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub confirmation_notice: Option<Option<String>>,
}

pub fn validate_create_contest(payload: &CreateContestRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_dates(
        payload.start_date,
        payload.end_date,
        payload.publish_date.unwrap_or(payload.end_date),
    )
}

/// Start must precede end, and results cannot be published before the end.
pub fn validate_dates(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    publish: DateTime<Utc>,
) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::field("end_date", "End date must be after start date"));
    }
    if publish < end {
        return Err(AppError::field(
            "publish_date",
            "Publish date must not be before end date",
        ));
    }
    Ok(())
}

/// List filters for contests.
#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct ContestListQuery {
    /// Only contests open for submissions now (`true`) or not (`false`).
    pub is_active: Option<bool>,
    /// Only contests the caller has (`true`) or has not (`false`) submitted to.
    pub submitted: Option<bool>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateThemeRequest {
    #[schema(example = "Landscape")]
    pub title: String,
    #[serde(default)]
    pub is_series: bool,
    /// Maximum number of photos per submission.
    #[schema(example = 4)]
    pub n_photos: i32,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateThemeRequest {
    pub title: Option<String>,
    pub is_series: Option<bool>,
    pub n_photos: Option<i32>,
}

pub fn validate_n_photos(n_photos: i32) -> Result<(), AppError> {
    if !(1..=100).contains(&n_photos) {
        return Err(AppError::field("n_photos", "Number of photos must be 1-100"));
    }
    Ok(())
}

pub fn validate_create_theme(payload: &CreateThemeRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_n_photos(payload.n_photos)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AddJudgeRequest {
    pub user_id: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct ThemeResultsRequest {
    /// Minimum rating sum for acceptance.
    #[schema(example = 12)]
    pub accepted_threshold: i32,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct SubmissionRewardRequest {
    /// 1 = Gold, 2 = Silver, 3 = Bronze, 4 = Honorable Mention.
    #[schema(example = 1)]
    pub kind: i32,
    #[schema(example = "Salon gold medal")]
    pub label: String,
}

pub fn validate_submission_reward(payload: &SubmissionRewardRequest) -> Result<(), AppError> {
    if crate::entity::submission_reward::kind_name(payload.kind).is_none() {
        return Err(AppError::field("kind", "Reward kind must be 1-4"));
    }
    validate_max_len("label", &payload.label, 100)
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct AuthorRewardRequest {
    pub theme_id: i32,
    #[schema(example = "Best young author")]
    pub label: String,
}

// ---------------------------------------------------------------------------
// Response DTOs
// ---------------------------------------------------------------------------

#[derive(Serialize, utoipa::ToSchema)]
pub struct ThemeResponse {
    pub id: i32,
    pub contest_id: i32,
    pub title: String,
    pub is_series: bool,
    pub n_photos: i32,
    /// Number of submissions in this theme.
    pub submissions_number: u64,
    pub created_at: DateTime<Utc>,
}

impl ThemeResponse {
    pub fn new(m: theme::Model, submissions_number: u64) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            title: m.title,
            is_series: m.is_series,
            n_photos: m.n_photos,
            submissions_number,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestResponse {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub publish_date: DateTime<Utc>,
    pub login_required: bool,
    pub confirmation_notice: Option<String>,
    /// Open for submissions right now.
    pub is_active: bool,
    pub themes: Vec<ThemeResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContestResponse {
    pub fn new(m: contest::Model, themes: Vec<ThemeResponse>, now: DateTime<Utc>) -> Self {
        Self {
            is_active: m.is_active(now),
            id: m.id,
            title: m.title,
            description: m.description,
            start_date: m.start_date,
            end_date: m.end_date,
            publish_date: m.publish_date,
            login_required: m.login_required,
            confirmation_notice: m.confirmation_notice,
            themes,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ContestListResponse {
    pub data: Vec<ContestResponse>,
    pub total: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct JudgeResponse {
    pub id: i32,
    pub contest_id: i32,
    pub user_id: i32,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl JudgeResponse {
    pub fn new(m: judge::Model, username: String) -> Self {
        Self {
            id: m.id,
            contest_id: m.contest_id,
            user_id: m.user_id,
            username,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ThemeResultsResponse {
    pub theme_id: i32,
    pub accepted_threshold: i32,
}

impl From<crate::entity::theme_results::Model> for ThemeResultsResponse {
    fn from(m: crate::entity::theme_results::Model) -> Self {
        Self {
            theme_id: m.theme_id,
            accepted_threshold: m.accepted_threshold,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionRewardResponse {
    pub submission_id: i32,
    pub kind: i32,
    /// Display name of `kind`.
    #[schema(example = "Gold")]
    pub kind_name: Option<String>,
    pub label: String,
}

impl From<crate::entity::submission_reward::Model> for SubmissionRewardResponse {
    fn from(m: crate::entity::submission_reward::Model) -> Self {
        Self {
            submission_id: m.submission_id,
            kind: m.kind,
            kind_name: crate::entity::submission_reward::kind_name(m.kind).map(str::to_string),
            label: m.label,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthorRewardResponse {
    pub author_id: i32,
    pub theme_id: i32,
    pub label: String,
}

impl From<crate::entity::author_reward::Model> for AuthorRewardResponse {
    fn from(m: crate::entity::author_reward::Model) -> Self {
        Self {
            author_id: m.author_id,
            theme_id: m.theme_id,
            label: m.label,
        }
    }
}

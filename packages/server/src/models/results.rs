use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::author::AuthorResponse;
use super::media::MediaFileResponse;

/// Author as shown in results, with their author-level reward.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthorResultResponse {
    #[serde(flatten)]
    pub author: AuthorResponse,
    pub reward: Option<String>,
    pub reward_theme: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResultResponse {
    pub id: i32,
    pub theme_id: i32,
    pub title: String,
    pub description: String,
    pub author: AuthorResultResponse,
    pub accepted: bool,
    /// Sum of all judges' ratings, `null` when unrated.
    pub rating: Option<i64>,
    /// `Gold`, `Silver`, `Bronze` or `Honorable Mention`.
    pub reward_kind: Option<String>,
    pub reward_label: Option<String>,
    /// Only present for accepted submissions.
    pub media: Option<Vec<MediaFileResponse>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ThemeResultResponse {
    pub id: i32,
    pub contest_id: i32,
    pub title: String,
    pub is_series: bool,
    pub n_photos: i32,
    pub accepted_threshold: Option<i32>,
    pub submissions: Vec<SubmissionResultResponse>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResultListResponse {
    pub data: Vec<SubmissionResultResponse>,
    pub total: u64,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct SubmissionResultQuery {
    pub theme: Option<i32>,
    pub contest: Option<i32>,
    /// `rating` (ascending) or `-rating` (descending, the default).
    pub ordering: Option<String>,
}

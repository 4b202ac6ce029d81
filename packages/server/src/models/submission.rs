use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::author::AuthorResponse;
use super::media::MediaFileResponse;
use super::shared::{validate_max_len, validate_title};
use crate::error::AppError;

/// One submission in a create request. The media ids must reference files
/// uploaded by the caller that are not linked yet.
#[derive(Deserialize, Clone, utoipa::ToSchema)]
pub struct CreateSubmissionRequest {
    pub author_id: i32,
    pub theme_id: i32,
    #[schema(example = json!([7, 8]))]
    pub media_ids: Vec<i32>,
    #[schema(example = "Morning fog")]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

/// A create request is either one submission or a batch.
#[derive(Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum CreateSubmissionsBody {
    Many(Vec<CreateSubmissionRequest>),
    One(CreateSubmissionRequest),
}

impl CreateSubmissionsBody {
    pub fn into_vec(self) -> Vec<CreateSubmissionRequest> {
        match self {
            CreateSubmissionsBody::Many(items) => items,
            CreateSubmissionsBody::One(item) => vec![item],
        }
    }
}

pub fn validate_create_submission(payload: &CreateSubmissionRequest) -> Result<(), AppError> {
    validate_title(&payload.title)?;
    validate_max_len("description", &payload.description, 2000)
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct SubmissionListQuery {
    pub theme: Option<i32>,
    pub contest: Option<i32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    pub id: i32,
    pub user_id: i32,
    pub theme_id: i32,
    pub title: String,
    pub description: String,
    pub author: AuthorResponse,
    pub media: Vec<MediaFileResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionListResponse {
    pub data: Vec<SubmissionResponse>,
    pub total: u64,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionSetResponse {
    pub id: i32,
    pub contest_id: i32,
    pub user_id: i32,
    pub author: AuthorResponse,
    pub submissions: Vec<SubmissionResponse>,
    /// Payment state, `false` when no payment was recorded.
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionSetListResponse {
    pub data: Vec<SubmissionSetResponse>,
    pub total: u64,
}

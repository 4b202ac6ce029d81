use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::media_file;

/// A stored photo. The original and thumbnail bytes are served separately.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MediaFileResponse {
    pub id: i32,
    /// Download URL of the original.
    #[schema(example = "/api/v1/media/7/file")]
    pub file: String,
    /// Download URL of the thumbnail.
    #[schema(example = "/api/v1/media/7/thumbnail")]
    pub thumbnail: String,
    #[schema(example = "image/jpeg")]
    pub content_type: String,
    pub size: i64,
    pub width: i32,
    pub height: i32,
    /// Submission this file belongs to, if linked.
    pub submission_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<media_file::Model> for MediaFileResponse {
    fn from(m: media_file::Model) -> Self {
        Self {
            file: format!("/api/v1/media/{}/file", m.id),
            thumbnail: format!("/api/v1/media/{}/thumbnail", m.id),
            id: m.id,
            content_type: m.content_type,
            size: m.size,
            width: m.width,
            height: m.height,
            submission_id: m.submission_id,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MediaListResponse {
    pub data: Vec<MediaFileResponse>,
    pub total: u64,
}

#[derive(Deserialize, Default, utoipa::IntoParams)]
pub struct MediaListQuery {
    /// Only files not yet linked into a submission.
    pub unlinked: Option<bool>,
}

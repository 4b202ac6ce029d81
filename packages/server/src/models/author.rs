use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::shared::{double_option, validate_email, validate_max_len, validate_required};
use crate::entity::author;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateAuthorRequest {
    #[schema(example = "Ana")]
    pub first_name: String,
    #[schema(example = "Novak")]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(default)]
    pub club: Option<String>,
    #[serde(default)]
    pub mentor: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateAuthorRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub dob: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub school: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub club: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub mentor: Option<Option<String>>,
}

fn validate_optional_text(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(v) => validate_max_len(field, v, 60),
        None => Ok(()),
    }
}

pub fn validate_create_author(payload: &CreateAuthorRequest) -> Result<(), AppError> {
    validate_required("first_name", &payload.first_name, 30)?;
    validate_required("last_name", &payload.last_name, 30)?;
    validate_email("email", payload.email.as_deref())?;
    validate_optional_text("school", payload.school.as_deref())?;
    validate_optional_text("club", payload.club.as_deref())?;
    validate_optional_text("mentor", payload.mentor.as_deref())
}

pub fn validate_update_author(payload: &UpdateAuthorRequest) -> Result<(), AppError> {
    if let Some(first_name) = &payload.first_name {
        validate_required("first_name", first_name, 30)?;
    }
    if let Some(last_name) = &payload.last_name {
        validate_required("last_name", last_name, 30)?;
    }
    validate_email("email", payload.email.clone().flatten().as_deref())?;
    validate_optional_text("school", payload.school.clone().flatten().as_deref())?;
    validate_optional_text("club", payload.club.clone().flatten().as_deref())?;
    validate_optional_text("mentor", payload.mentor.clone().flatten().as_deref())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthorResponse {
    pub id: i32,
    pub user_id: i32,
    pub first_name: String,
    pub last_name: String,
    /// Only shown to admins.
    pub email: Option<String>,
    pub dob: Option<NaiveDate>,
    pub school: Option<String>,
    pub club: Option<String>,
    pub mentor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuthorResponse {
    pub fn new(m: author::Model, show_email: bool) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            first_name: m.first_name,
            last_name: m.last_name,
            email: if show_email { m.email } else { None },
            dob: m.dob,
            school: m.school,
            club: m.club,
            mentor: m.mentor,
            created_at: m.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AuthorListResponse {
    pub data: Vec<AuthorResponse>,
    pub total: u64,
}

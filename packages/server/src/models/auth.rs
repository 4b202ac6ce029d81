use crate::error::AppError;
use crate::models::shared::validate_email;
use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    /// Unique username (1-32 chars, alphanumeric and underscores).
    #[schema(example = "ana_novak")]
    pub username: String,
    /// Password (8-128 characters).
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
    /// Address for submission confirmations.
    #[schema(example = "ana@example.com")]
    #[serde(default)]
    pub email: Option<String>,
}

pub fn validate_register_request(payload: &RegisterRequest) -> Result<(), AppError> {
    let username = payload.username.trim();
    if username.is_empty() || username.chars().count() > 32 {
        return Err(AppError::field(
            "username",
            "Username must be 1-32 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(AppError::field(
            "username",
            "Username must contain only letters, digits, and underscores",
        ));
    }
    if payload.password.len() < 8 || payload.password.len() > 128 {
        return Err(AppError::field(
            "password",
            "Password must be 8-128 characters",
        ));
    }
    validate_email("email", payload.email.as_deref())?;
    Ok(())
}

/// Request body for user login.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Username of the account to log into.
    #[schema(example = "ana_novak")]
    pub username: String,
    /// Account password.
    #[schema(example = "s3cure_P@ss!")]
    pub password: String,
}

pub fn validate_login_request(payload: &LoginRequest) -> Result<(), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::field("username", "Username must not be empty"));
    }
    if payload.password.is_empty() {
        return Err(AppError::field("password", "Password must not be empty"));
    }
    Ok(())
}

/// Successful registration response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct RegisterResponse {
    /// ID of the newly created user.
    #[schema(example = 42)]
    pub id: i32,
    /// Username of the newly created user.
    #[schema(example = "ana_novak")]
    pub username: String,
}

impl From<crate::entity::user::Model> for RegisterResponse {
    fn from(user: crate::entity::user::Model) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Successful login response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct LoginResponse {
    /// JWT bearer token valid for 7 days.
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub token: String,
    /// Authenticated user's username.
    #[schema(example = "ana_novak")]
    pub username: String,
    /// User's role.
    #[schema(example = "user")]
    pub role: String,
    /// Permissions granted to the user.
    #[schema(example = json!([]))]
    pub permissions: Vec<String>,
}

/// Current authenticated user's profile.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    /// User ID.
    #[schema(example = 42)]
    pub id: i32,
    /// Username.
    #[schema(example = "ana_novak")]
    pub username: String,
    /// Role.
    #[schema(example = "user")]
    pub role: String,
    /// Permissions.
    #[schema(example = json!([]))]
    pub permissions: Vec<String>,
}

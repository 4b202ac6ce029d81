use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `INVALID_CREDENTIALS`, `PERMISSION_DENIED`,
    /// `NOT_AUTHORIZED`, `NOT_FOUND`, `CONFLICT`, `USERNAME_TAKEN`,
    /// `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Max size of file is 10485760B")]
    pub message: String,
    /// Request field the error refers to, for per-field validation errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "file")]
    pub field: Option<String>,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation {
        field: Option<String>,
        message: String,
    },
    TokenMissing,
    TokenInvalid,
    InvalidCredentials,
    PermissionDenied(String),
    /// The caller is authenticated but not assigned to the resource, e.g. a
    /// judge rating a contest they do not judge.
    NotAuthorized(String),
    NotFound(String),
    Conflict(String),
    UsernameTaken,
    Internal(String),
}

impl AppError {
    /// Validation error not tied to a single field.
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            field: None,
            message: message.into(),
        }
    }

    /// Validation error for one request field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    pub fn forbidden() -> Self {
        AppError::PermissionDenied("Insufficient permissions".into())
    }

    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let (status, code, message, field) = match self {
            AppError::Validation { field, message } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message, field)
            }
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_MISSING",
                "Authentication required".into(),
                None,
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                "TOKEN_INVALID",
                "Invalid or expired token".into(),
                None,
            ),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Invalid username or password".into(),
                None,
            ),
            AppError::PermissionDenied(msg) => {
                (StatusCode::FORBIDDEN, "PERMISSION_DENIED", msg, None)
            }
            AppError::NotAuthorized(msg) => (StatusCode::FORBIDDEN, "NOT_AUTHORIZED", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            AppError::UsernameTaken => (
                StatusCode::CONFLICT,
                "USERNAME_TAKEN",
                "Username is already taken".into(),
                None,
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".into(),
                    None,
                )
            }
        };
        (
            status,
            ErrorBody {
                code,
                message,
                field,
            },
        )
    }

    /// Error code as exposed in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::TokenMissing => "TOKEN_MISSING",
            AppError::TokenInvalid => "TOKEN_INVALID",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::PermissionDenied(_) => "PERMISSION_DENIED",
            AppError::NotAuthorized(_) => "NOT_AUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::UsernameTaken => "USERNAME_TAKEN",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation {
                field: Some(field),
                message,
            } => write!(f, "{field}: {message}"),
            AppError::Validation { message, .. }
            | AppError::PermissionDenied(message)
            | AppError::NotAuthorized(message)
            | AppError::NotFound(message)
            | AppError::Conflict(message)
            | AppError::Internal(message) => f.write_str(message),
            other => f.write_str(other.code()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => {
                tracing::warn!(key = %key, "Blob missing from storage");
                AppError::NotFound("File not found".into())
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

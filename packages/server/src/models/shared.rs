use serde::{Deserialize, Deserializer};

use crate::error::AppError;

/// Serde helper for PATCH semantics on nullable fields.
///
/// * JSON field absent  => `None`          (don't update)
/// * JSON field = null  => `Some(None)`    (set to NULL)
/// * JSON field = value => `Some(Some(v))` (set to value)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Validate a trimmed title (1-100 Unicode characters).
pub fn validate_title(title: &str) -> Result<(), AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 100 {
        return Err(AppError::field("title", "Title must be 1-100 characters"));
    }
    Ok(())
}

/// Validate the length of a free-text field.
pub fn validate_max_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::field(
            field,
            format!("Ensure this field has no more than {max} characters"),
        ));
    }
    Ok(())
}

/// Validate a required short name (1-`max` characters after trimming).
pub fn validate_required(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::field(field, "This field may not be blank"));
    }
    validate_max_len(field, value.trim(), max)
}

/// Minimal shape check for optional e-mail fields.
pub fn validate_email(field: &str, value: Option<&str>) -> Result<(), AppError> {
    if let Some(email) = value {
        let email = email.trim();
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid || email.chars().count() > 254 {
            return Err(AppError::field(field, "Enter a valid email address"));
        }
    }
    Ok(())
}

//! Error taxonomy shared by every store.

use serde::Serialize;

/// A single field-level validation message, reported back to the caller
/// next to the field it belongs to.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Bad input. Always recoverable by resubmission.
    #[error("validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// The named entity does not exist (or is outside the caller's scope).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The caller is not allowed to touch this entity.
    #[error("no permission to modify this {0}")]
    PermissionDenied(&'static str),

    /// Authentication required or the presented credentials are stale.
    #[error("authentication required")]
    Unauthorized,

    /// Storage-layer or other unexpected failure. Logged at the operation
    /// boundary and reported as a generic message.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl StoreError {
    /// Single-field validation error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Internal(anyhow::Error::new(err).context("sqlite operation failed"))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Returns the `table.column` name of the violated UNIQUE constraint, if
/// this error is one. Used to absorb toggle races and to turn duplicate
/// inserts into field errors instead of 500s.
pub fn unique_violation(err: &rusqlite::Error) -> Option<String> {
    match err {
        rusqlite::Error::SqliteFailure(failure, Some(message))
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            message
                .strip_prefix("UNIQUE constraint failed: ")
                .map(ToOwned::to_owned)
        },
        _ => None,
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|err| format!("{}: {}", err.field, err.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_formats_all_fields() {
        let err = StoreError::Validation(vec![
            FieldError::new("email", "already in use"),
            FieldError::new("username", "too short"),
        ]);
        let text = err.to_string();
        assert!(text.contains("email: already in use"));
        assert!(text.contains("username: too short"));
    }

    #[test]
    fn unique_violation_extracts_column() {
        let failure = rusqlite::ffi::Error {
            code: rusqlite::ErrorCode::ConstraintViolation,
            extended_code: 2067,
        };
        let err = rusqlite::Error::SqliteFailure(
            failure,
            Some("UNIQUE constraint failed: users.email".to_string()),
        );
        assert_eq!(unique_violation(&err).as_deref(), Some("users.email"));
    }
}

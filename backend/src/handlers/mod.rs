//! JSON handlers, grouped per app. Everything speaks the same envelope:
//! `{"success": true, ...}` on the happy path, [`ApiError`] otherwise.

pub mod accounts;
pub mod blog;
pub mod comments;
pub mod contact;
pub mod engagement;
pub mod site;

use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::Json;
use modern_blog_shared::StoreError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

pub type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

/// Happy-path envelope for operations whose payload is just a message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

/// Maps a store error onto a status + JSON payload. Internal failures are
/// logged here (the operation boundary) and reported generically.
pub fn error_response(context: &str, err: StoreError) -> (StatusCode, Json<ApiError>) {
    match err {
        StoreError::Validation(field_errors) => {
            let mut errors: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for field_error in field_errors {
                errors
                    .entry(field_error.field)
                    .or_default()
                    .push(field_error.message);
            }
            (
                StatusCode::BAD_REQUEST,
                Json(ApiError {
                    success: false,
                    message: "Please correct the errors below and try again.".to_string(),
                    errors: Some(errors),
                }),
            )
        },
        StoreError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(ApiError {
                success: false,
                message: format!("{what} not found"),
                errors: None,
            }),
        ),
        StoreError::PermissionDenied(what) => (
            StatusCode::FORBIDDEN,
            Json(ApiError {
                success: false,
                message: format!("You do not have permission to modify this {what}."),
                errors: None,
            }),
        ),
        StoreError::Unauthorized => unauthorized(),
        StoreError::Internal(err) => {
            tracing::error!("{context}: {err:#}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiError {
                    success: false,
                    message: "Something went wrong. Please try again.".to_string(),
                    errors: None,
                }),
            )
        },
    }
}

pub fn unauthorized() -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            success: false,
            message: "Authentication required.".to_string(),
            errors: None,
        }),
    )
}

pub fn not_found(what: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            success: false,
            message: format!("{what} not found"),
            errors: None,
        }),
    )
}

/// Fresh in-memory state for handler tests.
#[cfg(test)]
pub(crate) fn test_state() -> crate::state::AppState {
    let db = modern_blog_shared::Database::open_in_memory().expect("in-memory db");
    crate::state::AppState::new(db, modern_blog_shared::models::CommentStatus::Approved, None)
}

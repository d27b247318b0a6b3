//! Like/bookmark toggles and bookmark notes. These are the AJAX endpoints;
//! responses carry the fresh counts so clients can update in place.

use axum::extract::{Path, State};
use axum::response::Json;
use modern_blog_shared::models::BlogRecord;
use modern_blog_shared::Scope;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::handlers::{error_response, not_found, ApiError, ApiResult, MessageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookmarkNotesRequest {
    pub notes: String,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub success: bool,
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Serialize)]
pub struct BookmarkResponse {
    pub success: bool,
    pub bookmarked: bool,
    pub bookmark_count: i64,
    pub message: String,
}

pub async fn toggle_like(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<LikeResponse> {
    let blog = resolve_blog(&state, &slug)?;
    let outcome = state
        .engagement
        .toggle_like(user.id, blog.id)
        .map_err(|err| error_response("toggle like", err))?;

    Ok(Json(LikeResponse {
        success: true,
        liked: outcome.added,
        like_count: outcome.count,
    }))
}

pub async fn toggle_bookmark(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<BookmarkResponse> {
    let blog = resolve_blog(&state, &slug)?;
    let outcome = state
        .engagement
        .toggle_bookmark(user.id, blog.id)
        .map_err(|err| error_response("toggle bookmark", err))?;

    let message = if outcome.added {
        "Post added to your bookmarks."
    } else {
        "Post removed from your bookmarks."
    };
    Ok(Json(BookmarkResponse {
        success: true,
        bookmarked: outcome.added,
        bookmark_count: outcome.count,
        message: message.to_string(),
    }))
}

pub async fn update_bookmark_notes(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<BookmarkNotesRequest>,
) -> ApiResult<MessageResponse> {
    let blog = resolve_blog(&state, &slug)?;
    state
        .engagement
        .update_bookmark_notes(user.id, blog.id, &request.notes)
        .map_err(|err| error_response("update bookmark notes", err))?;
    Ok(MessageResponse::ok("Your bookmark notes have been saved."))
}

fn resolve_blog(
    state: &AppState,
    slug: &str,
) -> Result<BlogRecord, (axum::http::StatusCode, Json<ApiError>)> {
    state
        .blogs
        .get_blog_by_slug(slug, Scope::Active)
        .map_err(|err| error_response("fetch blog", err))?
        .ok_or_else(|| not_found("blog post"))
}

//! Comment endpoints: create on a post, reply to a comment, delete own.

use axum::extract::{Path, State};
use axum::response::Json;
use modern_blog_shared::comments_store::NewCommentInput;
use modern_blog_shared::models::CommentRecord;
use modern_blog_shared::Scope;
use serde::{Deserialize, Serialize};

use crate::auth::AuthUser;
use crate::handlers::{error_response, not_found, ApiResult, MessageResponse};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewCommentRequest {
    pub content: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct CommentResponse {
    pub success: bool,
    pub message: String,
    pub comment: CommentRecord,
    pub depth: i64,
}

pub async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Json(request): Json<NewCommentRequest>,
) -> ApiResult<CommentResponse> {
    let blog = state
        .blogs
        .get_blog_by_slug(&slug, Scope::Active)
        .map_err(|err| error_response("fetch blog", err))?
        .ok_or_else(|| not_found("blog post"))?;

    let comment = state
        .comments
        .create_comment(
            NewCommentInput {
                blog_id: blog.id,
                user_id: user.id,
                content: request.content,
                parent_id: request.parent_id,
                name: None,
                email: None,
            },
            state.comment_default_status,
        )
        .map_err(|err| error_response("create comment", err))?;
    let depth = state
        .comments
        .comment_depth(comment.id)
        .map_err(|err| error_response("comment depth", err))?;

    Ok(Json(CommentResponse {
        success: true,
        message: "Your comment has been posted.".to_string(),
        comment,
        depth,
    }))
}

/// Reply resolves the blog through the parent comment, so a reply can never
/// land on a different post than its parent.
pub async fn reply(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
    Json(request): Json<ReplyRequest>,
) -> ApiResult<CommentResponse> {
    let parent = state
        .comments
        .get_comment(comment_id)
        .map_err(|err| error_response("fetch parent comment", err))?
        .ok_or_else(|| not_found("comment"))?;

    let comment = state
        .comments
        .create_comment(
            NewCommentInput {
                blog_id: parent.blog_id,
                user_id: user.id,
                content: request.content,
                parent_id: Some(parent.id),
                name: None,
                email: None,
            },
            state.comment_default_status,
        )
        .map_err(|err| error_response("create reply", err))?;
    let depth = state
        .comments
        .comment_depth(comment.id)
        .map_err(|err| error_response("comment depth", err))?;

    Ok(Json(CommentResponse {
        success: true,
        message: "Your reply has been posted.".to_string(),
        comment,
        depth,
    }))
}

pub async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(comment_id): Path<i64>,
) -> ApiResult<MessageResponse> {
    state
        .comments
        .delete_comment(user.id, comment_id)
        .map_err(|err| error_response("delete comment", err))?;
    Ok(MessageResponse::ok("Your comment has been deleted."))
}

//! Comment, reply and comment-like API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};

use super::{session, success, ApiResult};
use crate::models::{Comment, CommentRequest, LikeOutcome, LikeStatus, Reply};
use crate::session::Identity;
use crate::AppState;

/// GET /api/posts/:id/comments - Comments, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    identity: Identity,
    Path(post_id): Path<String>,
) -> ApiResult<Vec<Comment>> {
    let session = session(&state, identity)?;
    success(crate::comments::list_comments(&session, &post_id).await?)
}

/// POST /api/posts/:id/comments - Comment on a post.
pub async fn create_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path(post_id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<Comment> {
    let session = session(&state, identity)?;
    success(crate::comments::create_comment(&session, &post_id, request).await?)
}

/// PUT /api/posts/:id/comments/:cid - Edit a comment (author only).
pub async fn update_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<Comment> {
    let session = session(&state, identity)?;
    success(crate::comments::update_comment(&session, &post_id, &comment_id, request).await?)
}

/// DELETE /api/posts/:id/comments/:cid - Delete a comment (author only).
pub async fn delete_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> ApiResult<()> {
    let session = session(&state, identity)?;
    crate::comments::delete_comment(&session, &post_id, &comment_id).await?;
    success(())
}

/// POST /api/posts/:id/comments/:cid/like - Toggle the caller's like on a comment.
pub async fn toggle_comment_like(
    State(state): State<AppState>,
    identity: Identity,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> ApiResult<LikeOutcome> {
    let session = session(&state, identity)?;
    success(crate::likes::toggle_comment_like(&session, &post_id, &comment_id).await?)
}

/// GET /api/posts/:id/comments/:cid/like - Whether the caller likes the comment.
pub async fn comment_like_status(
    State(state): State<AppState>,
    identity: Identity,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> ApiResult<LikeStatus> {
    let session = session(&state, identity)?;
    success(crate::likes::comment_like_status(&session, &post_id, &comment_id).await?)
}

/// GET /api/posts/:id/comments/:cid/replies - Replies, oldest first.
pub async fn list_replies(
    State(state): State<AppState>,
    identity: Identity,
    Path((post_id, comment_id)): Path<(String, String)>,
) -> ApiResult<Vec<Reply>> {
    let session = session(&state, identity)?;
    success(crate::comments::list_replies(&session, &post_id, &comment_id).await?)
}

/// POST /api/posts/:id/comments/:cid/replies - Reply to a comment.
pub async fn create_reply(
    State(state): State<AppState>,
    identity: Identity,
    Path((post_id, comment_id)): Path<(String, String)>,
    Json(request): Json<CommentRequest>,
) -> ApiResult<Reply> {
    let session = session(&state, identity)?;
    success(crate::comments::create_reply(&session, &post_id, &comment_id, request).await?)
}

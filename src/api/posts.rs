//! Post and like API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use std::collections::BTreeMap;

use super::{session, success, ApiResult, LimitQuery, MAX_LIST_LIMIT};
use crate::errors::AppError;
use crate::models::{
    CheckLikesRequest, CreatePostRequest, LikeOutcome, LikeStatus, Post, PostLikes, PostStats,
    UpdatePostRequest,
};
use crate::session::Identity;
use crate::AppState;

/// GET /api/posts - Newest posts.
pub async fn list_posts(
    State(state): State<AppState>,
    identity: Identity,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Vec<Post>> {
    let session = session(&state, identity)?;
    success(crate::posts::list_posts(&session, params.resolve(&state)).await?)
}

/// POST /api/posts - Create a post.
pub async fn create_post(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CreatePostRequest>,
) -> ApiResult<Post> {
    let session = session(&state, identity)?;
    success(crate::posts::create_post(&session, request).await?)
}

/// GET /api/posts/:id - Get a single post.
pub async fn get_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<Post> {
    let session = session(&state, identity)?;
    success(crate::posts::get_post(&session, &id).await?)
}

/// PUT /api/posts/:id - Edit a post (author only).
pub async fn update_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
    Json(request): Json<UpdatePostRequest>,
) -> ApiResult<Post> {
    let session = session(&state, identity)?;
    success(crate::posts::update_post(&session, &id, request).await?)
}

/// DELETE /api/posts/:id - Delete a post (author only).
pub async fn delete_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let session = session(&state, identity)?;
    crate::posts::delete_post(&session, &id).await?;
    success(())
}

/// POST /api/posts/:id/share - Count a share.
pub async fn share_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<u64> {
    let session = session(&state, identity)?;
    success(crate::posts::share_post(&session, &id).await?)
}

/// GET /api/posts/stats - Totals across all posts.
pub async fn post_stats(State(state): State<AppState>, identity: Identity) -> ApiResult<PostStats> {
    let session = session(&state, identity)?;
    success(crate::posts::post_stats(&session).await?)
}

/// POST /api/posts/:id/like - Toggle the caller's like.
pub async fn toggle_post_like(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<LikeOutcome> {
    let session = session(&state, identity)?;
    success(crate::likes::toggle_post_like(&session, &id).await?)
}

/// GET /api/posts/:id/like - Whether the caller likes the post.
pub async fn post_like_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<LikeStatus> {
    let session = session(&state, identity)?;
    success(crate::likes::post_like_status(&session, &id).await?)
}

/// POST /api/likes/check - Liked state of several posts.
pub async fn check_likes(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CheckLikesRequest>,
) -> ApiResult<BTreeMap<String, bool>> {
    if request.post_ids.len() > MAX_LIST_LIMIT {
        return Err(AppError::Validation(format!(
            "At most {} post ids per request",
            MAX_LIST_LIMIT
        )));
    }
    let session = session(&state, identity)?;
    success(crate::likes::check_multiple(&session, &request.post_ids).await?)
}

/// GET /api/posts/:id/likes - Everyone who likes the post.
pub async fn post_likes(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<PostLikes> {
    let session = session(&state, identity)?;
    success(crate::likes::post_likes(&session, &id).await?)
}

/// GET /api/users/:uid/posts - Posts written by a user.
pub async fn user_posts(
    State(state): State<AppState>,
    identity: Identity,
    Path(uid): Path<String>,
    Query(params): Query<LimitQuery>,
) -> ApiResult<Vec<Post>> {
    let session = session(&state, identity)?;
    success(crate::posts::user_posts(&session, &uid, params.resolve(&state)).await?)
}

//! Profile API endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use super::{session, success, ApiResult};
use crate::format;
use crate::models::{Post, ProfileStats, UpdateProfileRequest, UserProfile};
use crate::session::Identity;
use crate::AppState;

/// Profile header: the profile plus derived display fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub initials: String,
    pub handle: String,
    pub stats: ProfileStats,
}

/// GET /api/profile - The caller's profile, created on first view.
pub async fn get_profile(State(state): State<AppState>, identity: Identity) -> ApiResult<ProfileResponse> {
    let session = session(&state, identity)?;
    let profile = crate::profile::get_or_create_profile(&session, session.uid()).await?;
    let stats = crate::profile::profile_stats(&session, session.uid()).await?;

    success(ProfileResponse {
        initials: format::initials(Some(&profile.display_name)),
        handle: format::username_handle(&profile.display_name),
        profile,
        stats,
    })
}

/// PUT /api/profile - Edit display name and bio.
pub async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<UserProfile> {
    let session = session(&state, identity)?;
    success(crate::profile::update_profile(&session, request).await?)
}

/// GET /api/profile/liked - Posts the caller likes, newest first.
pub async fn liked_posts(State(state): State<AppState>, identity: Identity) -> ApiResult<Vec<Post>> {
    let session = session(&state, identity)?;
    success(crate::likes::liked_posts(&session, session.uid()).await?)
}

/// POST /api/session - Record a sign-in and return the caller's profile.
pub async fn sign_in(State(state): State<AppState>, identity: Identity) -> ApiResult<UserProfile> {
    let session = crate::session::Session::sign_in(state.store.clone(), identity).await?;
    success(crate::profile::get_or_create_profile(&session, session.uid()).await?)
}

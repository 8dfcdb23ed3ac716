//! User profile model.

use serde::{Deserialize, Serialize};

/// Public profile stored at `users/{uid}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<i64>,
}

/// Request body for editing the signed-in user's profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
}

/// Profile counters shown on the profile header.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub posts: u64,
    pub likes: u64,
}

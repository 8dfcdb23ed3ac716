//! Like records and toggle outcomes.

use serde::{Deserialize, Serialize};

/// Existence of this record means "user likes content".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeRecord {
    pub user_id: String,
    pub timestamp: i64,
}

/// Result of a like toggle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub liked: bool,
    pub new_likes: u64,
}

/// Everyone who likes a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostLikes {
    pub likes: Vec<LikeRecord>,
    pub count: usize,
}

/// The caller's liked state alongside the current counter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeStatus {
    pub liked: bool,
    pub likes: u64,
}

/// Request body for a batch liked-state lookup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckLikesRequest {
    pub post_ids: Vec<String>,
}

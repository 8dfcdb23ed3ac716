//! Post model and request bodies.

use serde::{Deserialize, Serialize};

/// Link preview attached to a post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreview {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub domain: String,
}

/// A user-authored post with its denormalized counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(default)]
    pub id: String,
    pub author_id: String,
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    pub content: String,
    pub created_at: i64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<LinkPreview>,
}

/// Request body for creating a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub content: String,
    /// URL expanded into a link preview
    #[serde(default)]
    pub link_url: Option<String>,
}

/// Request body for editing a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    pub content: String,
}

/// Totals across all posts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostStats {
    pub total_posts: u64,
    pub total_likes: u64,
    pub total_comments: u64,
}

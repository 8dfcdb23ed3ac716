//! Comment and reply models.

use serde::{Deserialize, Serialize};

/// A comment on a post. The post id is implied by the store path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    pub created_at: i64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub replies: u64,
    #[serde(default)]
    pub edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<i64>,
}

/// A reply to a comment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub parent_comment_id: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    #[serde(default)]
    pub author_email: String,
    pub created_at: i64,
    #[serde(default)]
    pub likes: u64,
}

/// Request body for creating or editing a comment or reply.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest {
    pub content: String,
}

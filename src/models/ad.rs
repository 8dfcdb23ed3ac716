//! Promotional items spliced into the feed.

use serde::{Deserialize, Serialize};

/// A promotional item stored at `ads/{adId}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub target_url: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_placement")]
    pub placement: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: i64,
}

/// Request body for registering an ad.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdRequest {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub target_url: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_placement")]
    pub placement: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

pub(crate) fn default_format() -> String {
    "card".to_string()
}

pub(crate) fn default_placement() -> String {
    "middle".to_string()
}

fn default_active() -> bool {
    true
}

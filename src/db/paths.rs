//! Path builders for every collection the feed touches.

pub const POSTS: &str = "posts";
pub const USERS: &str = "users";
pub const ADS: &str = "ads";
pub const LIKES: &str = "likes";
pub const COMMENTS: &str = "comments";
pub const REPLIES: &str = "replies";
pub const COMMENT_LIKES: &str = "commentLikes";
pub const NOTIFICATIONS: &str = "notifications";

pub fn post(post_id: &str) -> String {
    format!("{POSTS}/{post_id}")
}

pub fn comments(post_id: &str) -> String {
    format!("{COMMENTS}/{post_id}")
}

pub fn comment(post_id: &str, comment_id: &str) -> String {
    format!("{COMMENTS}/{post_id}/{comment_id}")
}

pub fn replies(post_id: &str, comment_id: &str) -> String {
    format!("{REPLIES}/{post_id}/{comment_id}")
}

pub fn replies_of_post(post_id: &str) -> String {
    format!("{REPLIES}/{post_id}")
}

pub fn reply(post_id: &str, comment_id: &str, reply_id: &str) -> String {
    format!("{REPLIES}/{post_id}/{comment_id}/{reply_id}")
}

pub fn likes(post_id: &str) -> String {
    format!("{LIKES}/{post_id}")
}

pub fn like(post_id: &str, user_id: &str) -> String {
    format!("{LIKES}/{post_id}/{user_id}")
}

pub fn comment_likes(post_id: &str, comment_id: &str) -> String {
    format!("{COMMENT_LIKES}/{post_id}/{comment_id}")
}

pub fn comment_likes_of_post(post_id: &str) -> String {
    format!("{COMMENT_LIKES}/{post_id}")
}

pub fn comment_like(post_id: &str, comment_id: &str, user_id: &str) -> String {
    format!("{COMMENT_LIKES}/{post_id}/{comment_id}/{user_id}")
}

pub fn notifications(user_id: &str) -> String {
    format!("{NOTIFICATIONS}/{user_id}")
}

pub fn notification(user_id: &str, notification_id: &str) -> String {
    format!("{NOTIFICATIONS}/{user_id}/{notification_id}")
}

pub fn user(user_id: &str) -> String {
    format!("{USERS}/{user_id}")
}

pub fn ad(ad_id: &str) -> String {
    format!("{ADS}/{ad_id}")
}

/// Split a path into `(parent, key)`.
///
/// Returns `None` for paths with empty segments or a single segment.
pub fn split(path: &str) -> Option<(&str, &str)> {
    if !is_valid(path) {
        return None;
    }
    path.rsplit_once('/')
}

/// A valid path has no empty segments.
pub fn is_valid(path: &str) -> bool {
    !path.is_empty() && path.split('/').all(|segment| !segment.is_empty())
}

/// A valid key is a single non-empty segment.
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty() && !key.contains('/')
}

/// Lower and upper bounds of every path strictly below `path`.
///
/// `'0'` is the character right after `'/'`, so `(path/, path0)` covers the subtree.
pub fn subtree_bounds(path: &str) -> (String, String) {
    (format!("{path}/"), format!("{path}0"))
}

/// Whether a change at `changed` is visible to a watcher of `watched`.
pub fn overlaps(watched: &str, changed: &str) -> bool {
    watched == changed
        || changed
            .strip_prefix(watched)
            .is_some_and(|rest| rest.starts_with('/'))
        || watched
            .strip_prefix(changed)
            .is_some_and(|rest| rest.starts_with('/'))
}

//! Local search over an in-memory snapshot of posts and profiles.
//!
//! The snapshot is loaded once per session and scanned linearly; there is
//! no index. Queries typed in quick succession go through a
//! [`QueryDebouncer`] so only the last one is evaluated.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db::paths;
use crate::errors::AppError;
use crate::models::{Post, UserProfile};
use crate::session::Session;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Which result kinds a search returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    #[default]
    All,
    Posts,
    Users,
}

impl SearchFilter {
    fn includes_posts(self) -> bool {
        matches!(self, SearchFilter::All | SearchFilter::Posts)
    }

    fn includes_users(self) -> bool {
        matches!(self, SearchFilter::All | SearchFilter::Users)
    }
}

impl FromStr for SearchFilter {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(SearchFilter::All),
            "posts" => Ok(SearchFilter::Posts),
            "users" => Ok(SearchFilter::Users),
            other => Err(AppError::Validation(format!("Unknown search filter: {}", other))),
        }
    }
}

/// Everything search scans.
#[derive(Debug, Clone, Default)]
pub struct SearchSnapshot {
    pub posts: Vec<Post>,
    pub users: Vec<UserProfile>,
}

impl SearchSnapshot {
    /// Read every post and profile from the store.
    pub async fn load(session: &Session) -> Result<Self, AppError> {
        let store = session.store();

        let posts = store
            .list_as::<Post>(paths::POSTS)
            .await?
            .into_iter()
            .map(|(id, mut post)| {
                post.id = id;
                post
            })
            .collect::<Vec<_>>();

        let users = store
            .list_as::<UserProfile>(paths::USERS)
            .await?
            .into_iter()
            .map(|(uid, mut user)| {
                user.uid = uid;
                user
            })
            .collect::<Vec<_>>();

        tracing::debug!(posts = posts.len(), users = users.len(), "Search snapshot loaded");
        Ok(Self { posts, users })
    }
}

/// Matches for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub query: String,
    pub posts: Vec<Post>,
    pub users: Vec<UserProfile>,
    pub total: usize,
}

/// Case-insensitive substring search over `snapshot`.
///
/// Posts that contain the query in their text rank first, newest first
/// within each group. Users keep snapshot order.
pub fn search(snapshot: &SearchSnapshot, query: &str, filter: SearchFilter) -> SearchResults {
    let query = query.trim();
    if query.is_empty() {
        return SearchResults::default();
    }
    let needle = query.to_lowercase();
    let contains = |haystack: &str| haystack.to_lowercase().contains(&needle);

    let mut posts: Vec<Post> = Vec::new();
    if filter.includes_posts() {
        posts = snapshot
            .posts
            .iter()
            .filter(|post| {
                contains(&post.content)
                    || contains(&post.author_name)
                    || post.link.as_ref().is_some_and(|link| {
                        contains(&link.title) || contains(&link.url) || contains(&link.description)
                    })
            })
            .cloned()
            .collect();

        posts.sort_by_cached_key(|post| {
            (
                std::cmp::Reverse(contains(&post.content)),
                std::cmp::Reverse(post.created_at),
            )
        });
    }

    let users: Vec<UserProfile> = if filter.includes_users() {
        snapshot
            .users
            .iter()
            .filter(|user| contains(&user.display_name) || contains(&user.email) || contains(&user.bio))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    SearchResults {
        query: query.to_string(),
        total: posts.len() + users.len(),
        posts,
        users,
    }
}

/// Delays work and drops it when a newer request arrives during the delay.
#[derive(Debug)]
pub struct QueryDebouncer {
    delay: Duration,
    generation: AtomicU64,
}

impl Default for QueryDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl QueryDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: AtomicU64::new(0),
        }
    }

    /// Wait out the delay, then run `work` unless superseded.
    ///
    /// Returns `None` for a superseded call.
    pub async fn run<T, F>(&self, work: F) -> Option<T>
    where
        F: FnOnce() -> T,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;

        if self.generation.load(Ordering::SeqCst) != ticket {
            tracing::trace!(ticket, "Debounced call superseded");
            return None;
        }
        Some(work())
    }
}

/// One [`QueryDebouncer`] per user, so one user's typing never cancels
/// another user's query.
///
/// Entries are weak: a debouncer lives only while a request for that user
/// holds it, and dead entries are pruned on the next lookup.
#[derive(Debug)]
pub struct UserDebouncers {
    delay: Duration,
    debouncers: Mutex<HashMap<String, Weak<QueryDebouncer>>>,
}

impl UserDebouncers {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            debouncers: Mutex::new(HashMap::new()),
        }
    }

    pub fn for_user(&self, uid: &str) -> Arc<QueryDebouncer> {
        let mut debouncers = self
            .debouncers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debouncers.retain(|_, debouncer| debouncer.strong_count() > 0);

        if let Some(debouncer) = debouncers.get(uid).and_then(Weak::upgrade) {
            return debouncer;
        }
        let debouncer = Arc::new(QueryDebouncer::new(self.delay));
        debouncers.insert(uid.to_string(), Arc::downgrade(&debouncer));
        debouncer
    }

    /// Number of users with a search in flight.
    pub fn active(&self) -> usize {
        self.debouncers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .filter(|debouncer| debouncer.strong_count() > 0)
            .count()
    }
}

//! Denormalized counters kept on content records.
//!
//! Adjustments go through [`DocumentStore::adjust_counter`], a single
//! atomic statement, so concurrent callers never lose an update and the
//! stored value never drops below zero.

use crate::db::DocumentStore;
use crate::errors::AppError;

/// Counter fields carried by posts and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterField {
    Likes,
    Comments,
    Shares,
    Replies,
}

impl CounterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CounterField::Likes => "likes",
            CounterField::Comments => "comments",
            CounterField::Shares => "shares",
            CounterField::Replies => "replies",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterChange {
    Increment,
    Decrement,
}

impl CounterChange {
    fn delta(self) -> i64 {
        match self {
            CounterChange::Increment => 1,
            CounterChange::Decrement => -1,
        }
    }
}

/// Apply `change` to `field` on the record at `path`, returning the new value.
///
/// Fails with not-found, and writes nothing, when the record is absent.
pub async fn adjust(
    store: &DocumentStore,
    path: &str,
    field: CounterField,
    change: CounterChange,
) -> Result<u64, AppError> {
    store
        .adjust_counter(path, field.as_str(), change.delta())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", path)))
}

/// Like [`adjust`], but a missing record is logged and ignored.
///
/// Used for secondary counters whose parent may already be gone.
pub async fn adjust_if_present(
    store: &DocumentStore,
    path: &str,
    field: CounterField,
    change: CounterChange,
) -> Result<Option<u64>, AppError> {
    match adjust(store, path, field, change).await {
        Ok(count) => Ok(Some(count)),
        Err(AppError::NotFound(_)) => {
            tracing::debug!(path, field = field.as_str(), "Counter parent missing, skipped");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Current value of `field` on the record at `path`; 0 when absent.
pub async fn read(store: &DocumentStore, path: &str, field: CounterField) -> Result<u64, AppError> {
    Ok(store
        .read(path)
        .await?
        .and_then(|doc| doc.get(field.as_str()).and_then(|v| v.as_u64()))
        .unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;
    use serde_json::json;

    #[tokio::test]
    async fn test_increment_and_decrement() {
        let (store, _dir) = test_store().await;
        store
            .write("posts/p1", &json!({"likes": 0, "comments": 2}))
            .await
            .unwrap();

        let likes = adjust(&store, "posts/p1", CounterField::Likes, CounterChange::Increment)
            .await
            .unwrap();
        assert_eq!(likes, 1);

        let comments = adjust(&store, "posts/p1", CounterField::Comments, CounterChange::Decrement)
            .await
            .unwrap();
        assert_eq!(comments, 1);
        assert_eq!(read(&store, "posts/p1", CounterField::Likes).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_never_negative() {
        let (store, _dir) = test_store().await;
        store.write("posts/p1", &json!({"shares": 0})).await.unwrap();

        for _ in 0..3 {
            let shares = adjust(&store, "posts/p1", CounterField::Shares, CounterChange::Decrement)
                .await
                .unwrap();
            assert_eq!(shares, 0);
        }
    }

    #[tokio::test]
    async fn test_missing_parent_is_not_found_without_placeholder() {
        let (store, _dir) = test_store().await;

        let err = adjust(&store, "posts/ghost", CounterField::Likes, CounterChange::Increment)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.exists("posts/ghost").await.unwrap());

        let skipped = adjust_if_present(
            &store,
            "posts/ghost",
            CounterField::Likes,
            CounterChange::Increment,
        )
        .await
        .unwrap();
        assert_eq!(skipped, None);
        assert_eq!(read(&store, "posts/ghost", CounterField::Likes).await.unwrap(), 0);
    }
}

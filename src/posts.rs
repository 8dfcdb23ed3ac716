//! Post creation, listing and author-only edits.

use serde_json::{Map, Value};

use crate::counters::{self, CounterChange, CounterField};
use crate::db::{paths, Subscription};
use crate::errors::AppError;
use crate::format::now_millis;
use crate::links;
use crate::models::{CreatePostRequest, Post, PostStats, UpdatePostRequest};
use crate::session::Session;

pub const MAX_POST_CHARS: usize = 5000;

/// Trim `content` and check it is non-empty and within `max_chars`.
pub(crate) fn clean_content(content: &str, max_chars: usize, what: &str) -> Result<String, AppError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", what)));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            what, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

pub async fn create_post(session: &Session, request: CreatePostRequest) -> Result<Post, AppError> {
    let content = clean_content(&request.content, MAX_POST_CHARS, "Post content")?;
    let link = match request.link_url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => Some(links::extract_link_metadata(url)?),
        _ => None,
    };

    let store = session.store();
    let identity = session.identity();
    let id = store.push_id();
    let post = Post {
        id: id.clone(),
        author_id: identity.uid.clone(),
        author_name: identity.name(),
        author_email: identity.email.clone(),
        content,
        created_at: now_millis(),
        likes: 0,
        comments: 0,
        shares: 0,
        link,
    };

    store.write(&paths::post(&id), &post).await?;
    tracing::info!(id = %id, author = %post.author_id, "Post created");
    Ok(post)
}

pub async fn get_post(session: &Session, post_id: &str) -> Result<Post, AppError> {
    check_id(post_id)?;
    let mut post: Post = session
        .store()
        .read_as(&paths::post(post_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
    post.id = post_id.to_string();
    Ok(post)
}

/// The newest `limit` posts.
pub async fn list_posts(session: &Session, limit: usize) -> Result<Vec<Post>, AppError> {
    let mut posts = all_posts(session).await?;
    posts.truncate(limit);
    Ok(posts)
}

/// The newest `limit` posts written by `uid`.
pub async fn user_posts(session: &Session, uid: &str, limit: usize) -> Result<Vec<Post>, AppError> {
    Ok(all_posts(session)
        .await?
        .into_iter()
        .filter(|post| post.author_id == uid)
        .take(limit)
        .collect())
}

/// Every post, newest first.
pub(crate) async fn all_posts(session: &Session) -> Result<Vec<Post>, AppError> {
    let entries = session.store().list_as::<Post>(paths::POSTS).await?;
    Ok(newest_first(entries))
}

pub async fn update_post(
    session: &Session,
    post_id: &str,
    request: UpdatePostRequest,
) -> Result<Post, AppError> {
    let content = clean_content(&request.content, MAX_POST_CHARS, "Post content")?;
    let post = get_post(session, post_id).await?;
    require_author(session, &post.author_id, "edit this post")?;

    let mut fields = Map::new();
    fields.insert("content".to_string(), Value::String(content));
    session.store().patch(&paths::post(post_id), fields).await?;

    tracing::info!(post_id, "Post updated");
    get_post(session, post_id).await
}

/// Delete a post together with its comments, replies and likes.
pub async fn delete_post(session: &Session, post_id: &str) -> Result<(), AppError> {
    let post = get_post(session, post_id).await?;
    require_author(session, &post.author_id, "delete this post")?;

    let store = session.store();
    let mut removed = store.delete(&paths::post(post_id)).await?;
    for dependent in [
        paths::comments(post_id),
        paths::replies_of_post(post_id),
        paths::likes(post_id),
        paths::comment_likes_of_post(post_id),
    ] {
        removed += store.delete(&dependent).await?;
    }

    tracing::info!(post_id, removed, "Post deleted");
    Ok(())
}

/// Count a share of the post. Returns the new share count.
pub async fn share_post(session: &Session, post_id: &str) -> Result<u64, AppError> {
    check_id(post_id)?;
    let shares = counters::adjust(
        session.store(),
        &paths::post(post_id),
        CounterField::Shares,
        CounterChange::Increment,
    )
    .await?;
    tracing::info!(post_id, shares, "Post shared");
    Ok(shares)
}

pub async fn post_stats(session: &Session) -> Result<PostStats, AppError> {
    let posts = session.store().list_as::<Post>(paths::POSTS).await?;

    Ok(posts.iter().fold(PostStats::default(), |mut stats, (_, post)| {
        stats.total_posts += 1;
        stats.total_likes += post.likes;
        stats.total_comments += post.comments;
        stats
    }))
}

/// Live view of the newest `limit` posts.
pub async fn watch_posts<F>(session: &Session, limit: usize, on_change: F) -> Result<Subscription, AppError>
where
    F: Fn(Vec<Post>) + Send + Sync + 'static,
{
    session
        .store()
        .subscribe(
            paths::POSTS,
            move |snapshot| {
                let mut posts = newest_first(from_snapshot(snapshot));
                posts.truncate(limit);
                on_change(posts)
            },
            |e| tracing::error!("Post subscription failed: {}", e),
        )
        .await
}

pub(crate) fn require_author(session: &Session, author_id: &str, action: &str) -> Result<(), AppError> {
    if author_id == session.uid() {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!("Only the author can {}", action)))
    }
}

fn check_id(post_id: &str) -> Result<(), AppError> {
    if paths::is_valid_key(post_id) {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid post id".to_string()))
    }
}

fn newest_first(entries: Vec<(String, Post)>) -> Vec<Post> {
    let mut posts: Vec<Post> = entries
        .into_iter()
        .map(|(id, mut post)| {
            post.id = id;
            post
        })
        .collect();
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    posts
}

fn from_snapshot(snapshot: Option<Value>) -> Vec<(String, Post)> {
    let Some(Value::Object(children)) = snapshot else {
        return Vec::new();
    };
    children
        .into_iter()
        .filter_map(|(id, value)| serde_json::from_value(value).ok().map(|post| (id, post)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_store, DocumentStore};
    use crate::session::Identity;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn session_for(store: &DocumentStore, uid: &str) -> Session {
        Session::new(store.clone(), Identity::new(uid, format!("{uid}@example.com"), None)).unwrap()
    }

    fn post_request(content: &str) -> CreatePostRequest {
        CreatePostRequest {
            content: content.to_string(),
            link_url: None,
        }
    }

    #[tokio::test]
    async fn test_create_post_trims_and_zeroes_counters() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");

        let post = create_post(&alice, post_request("  hello world  ")).await.unwrap();
        assert_eq!(post.content, "hello world");
        assert_eq!(post.author_name, "alice");
        assert_eq!((post.likes, post.comments, post.shares), (0, 0, 0));

        let stored = get_post(&alice, &post.id).await.unwrap();
        assert_eq!(stored, post);
    }

    #[tokio::test]
    async fn test_create_post_validation() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");

        let err = create_post(&alice, post_request("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = create_post(&alice, post_request(&"a".repeat(MAX_POST_CHARS + 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = create_post(
            &alice,
            CreatePostRequest {
                content: "look".into(),
                link_url: Some("not a url".into()),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert!(store.list(paths::POSTS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_post_with_link_preview() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");

        let post = create_post(
            &alice,
            CreatePostRequest {
                content: "read this".into(),
                link_url: Some("https://www.example.com/blog/my-first_post.html".into()),
            },
        )
        .await
        .unwrap();

        let link = post.link.unwrap();
        assert_eq!(link.title, "My First Post");
        assert_eq!(link.domain, "www.example.com");
    }

    #[tokio::test]
    async fn test_list_posts_newest_first() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");

        for (id, author, at) in [("a", "alice", 100), ("b", "bob", 300), ("c", "alice", 200)] {
            store
                .write(
                    &paths::post(id),
                    &json!({"authorId": author, "authorName": author, "content": id, "createdAt": at}),
                )
                .await
                .unwrap();
        }

        let ids: Vec<String> = list_posts(&alice, 10).await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let limited = list_posts(&alice, 2).await.unwrap();
        assert_eq!(limited.len(), 2);

        let mine: Vec<String> = user_posts(&alice, "alice", 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(mine, vec!["c", "a"]);
    }

    #[tokio::test]
    async fn test_only_author_can_edit_or_delete() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let bob = session_for(&store, "bob");

        let post = create_post(&alice, post_request("original")).await.unwrap();

        let err = update_post(&bob, &post.id, UpdatePostRequest { content: "hijack".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        let err = delete_post(&bob, &post.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let updated = update_post(&alice, &post.id, UpdatePostRequest { content: "edited".into() })
            .await
            .unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.created_at, post.created_at);
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let post = create_post(&alice, post_request("doomed")).await.unwrap();
        let id = post.id.clone();

        store.write(&paths::comment(&id, "c1"), &json!({"content": "x"})).await.unwrap();
        store.write(&paths::reply(&id, "c1", "r1"), &json!({"content": "y"})).await.unwrap();
        store.write(&paths::like(&id, "bob"), &json!({"userId": "bob"})).await.unwrap();
        store
            .write(&paths::comment_like(&id, "c1", "bob"), &json!({"userId": "bob"}))
            .await
            .unwrap();
        store.write("posts/other", &json!({"authorId": "bob", "authorName": "b", "content": "keep", "createdAt": 1})).await.unwrap();

        delete_post(&alice, &id).await.unwrap();

        assert!(get_post(&alice, &id).await.unwrap_err().is_not_found());
        assert_eq!(store.read_tree(&paths::comments(&id)).await.unwrap(), None);
        assert_eq!(store.read_tree(&paths::replies_of_post(&id)).await.unwrap(), None);
        assert_eq!(store.read_tree(&paths::likes(&id)).await.unwrap(), None);
        assert_eq!(store.read_tree(&paths::comment_likes_of_post(&id)).await.unwrap(), None);
        assert!(store.exists("posts/other").await.unwrap());
    }

    #[tokio::test]
    async fn test_share_and_stats() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let post = create_post(&alice, post_request("share me")).await.unwrap();

        assert_eq!(share_post(&alice, &post.id).await.unwrap(), 1);
        assert_eq!(share_post(&alice, &post.id).await.unwrap(), 2);
        assert!(share_post(&alice, "ghost").await.unwrap_err().is_not_found());

        store
            .write("posts/p2", &json!({"authorId": "bob", "authorName": "b", "content": "x", "createdAt": 1, "likes": 4, "comments": 2}))
            .await
            .unwrap();

        let stats = post_stats(&alice).await.unwrap();
        assert_eq!(
            stats,
            PostStats {
                total_posts: 2,
                total_likes: 4,
                total_comments: 2
            }
        );
    }

    #[tokio::test]
    async fn test_watch_posts_limits_and_orders() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let seen: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let subscription = watch_posts(&alice, 2, move |posts| {
            sink.lock().unwrap().push(posts.into_iter().map(|p| p.content).collect());
        })
        .await
        .unwrap();

        for (id, at) in [("a", 1), ("b", 2), ("c", 3)] {
            store
                .write(
                    &paths::post(id),
                    &json!({"authorId": "alice", "authorName": "a", "content": id, "createdAt": at}),
                )
                .await
                .unwrap();
        }
        subscription.unsubscribe();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen[0].is_empty());
        assert_eq!(seen[3], vec!["c".to_string(), "b".to_string()]);
    }
}

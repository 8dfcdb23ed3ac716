//! Comments on posts and replies to comments.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::counters::{self, CounterChange, CounterField};
use crate::db::{paths, DocumentStore, Subscription};
use crate::errors::AppError;
use crate::format::now_millis;
use crate::models::{Comment, CommentRequest, NotificationType, Post, Reply};
use crate::notifications;
use crate::posts::{clean_content, require_author, MAX_POST_CHARS};
use crate::session::Session;

/// Comment on a post as the session user.
pub async fn create_comment(
    session: &Session,
    post_id: &str,
    request: CommentRequest,
) -> Result<Comment, AppError> {
    check_id(post_id, "post")?;
    let content = clean_content(&request.content, MAX_POST_CHARS, "Comment")?;
    let store = session.store();

    let post: Post = store
        .read_as(&paths::post(post_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

    let identity = session.identity();
    let id = store.push_id();
    let comment = Comment {
        id: id.clone(),
        content,
        author_id: identity.uid.clone(),
        author_name: identity.name(),
        author_email: identity.email.clone(),
        created_at: now_millis(),
        likes: 0,
        replies: 0,
        edited: false,
        edited_at: None,
    };

    write_counted(
        store,
        &paths::comment(post_id, &id),
        &comment,
        &paths::post(post_id),
        CounterField::Comments,
    )
    .await?;

    if post.author_id != session.uid() {
        notifications::notify_best_effort(
            session,
            &post.author_id,
            NotificationType::Comment,
            Some(post_id),
            Some(&id),
            "commented on your post",
        )
        .await;
    }

    tracing::info!(post_id, comment_id = %id, "Comment created");
    Ok(comment)
}

/// Comments on a post, newest first.
pub async fn list_comments(session: &Session, post_id: &str) -> Result<Vec<Comment>, AppError> {
    check_id(post_id, "post")?;
    let entries = session
        .store()
        .list_as::<Comment>(&paths::comments(post_id))
        .await?;
    Ok(newest_first(entries))
}

/// Live view of a post's comments, newest first.
pub async fn watch_comments<F>(session: &Session, post_id: &str, on_change: F) -> Result<Subscription, AppError>
where
    F: Fn(Vec<Comment>) + Send + Sync + 'static,
{
    check_id(post_id, "post")?;
    session
        .store()
        .subscribe(
            &paths::comments(post_id),
            move |snapshot| {
                let entries = match snapshot {
                    Some(Value::Object(children)) => children
                        .into_iter()
                        .filter_map(|(id, v)| serde_json::from_value(v).ok().map(|c| (id, c)))
                        .collect(),
                    _ => Vec::new(),
                };
                on_change(newest_first(entries))
            },
            |e| tracing::error!("Comment subscription failed: {}", e),
        )
        .await
}

pub async fn get_comment(session: &Session, post_id: &str, comment_id: &str) -> Result<Comment, AppError> {
    check_id(post_id, "post")?;
    check_id(comment_id, "comment")?;
    let mut comment: Comment = session
        .store()
        .read_as(&paths::comment(post_id, comment_id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))?;
    comment.id = comment_id.to_string();
    Ok(comment)
}

/// Edit a comment. Only its author may do so.
pub async fn update_comment(
    session: &Session,
    post_id: &str,
    comment_id: &str,
    request: CommentRequest,
) -> Result<Comment, AppError> {
    let content = clean_content(&request.content, MAX_POST_CHARS, "Comment")?;
    let comment = get_comment(session, post_id, comment_id).await?;
    require_author(session, &comment.author_id, "edit this comment")?;

    let mut fields = Map::new();
    fields.insert("content".to_string(), Value::String(content));
    fields.insert("edited".to_string(), Value::Bool(true));
    fields.insert("editedAt".to_string(), Value::from(now_millis()));
    session
        .store()
        .patch(&paths::comment(post_id, comment_id), fields)
        .await?;

    tracing::info!(post_id, comment_id, "Comment updated");
    get_comment(session, post_id, comment_id).await
}

/// Delete a comment with its replies and likes.
pub async fn delete_comment(session: &Session, post_id: &str, comment_id: &str) -> Result<(), AppError> {
    let comment = get_comment(session, post_id, comment_id).await?;
    require_author(session, &comment.author_id, "delete this comment")?;

    let store = session.store();
    store.delete(&paths::comment(post_id, comment_id)).await?;
    store.delete(&paths::replies(post_id, comment_id)).await?;
    store.delete(&paths::comment_likes(post_id, comment_id)).await?;
    counters::adjust_if_present(
        store,
        &paths::post(post_id),
        CounterField::Comments,
        CounterChange::Decrement,
    )
    .await?;

    tracing::info!(post_id, comment_id, "Comment deleted");
    Ok(())
}

/// Reply to a comment as the session user.
pub async fn create_reply(
    session: &Session,
    post_id: &str,
    comment_id: &str,
    request: CommentRequest,
) -> Result<Reply, AppError> {
    let content = clean_content(&request.content, MAX_POST_CHARS, "Reply")?;
    // Fails with not-found before anything is written.
    get_comment(session, post_id, comment_id).await?;

    let store = session.store();
    let identity = session.identity();
    let id = store.push_id();
    let reply = Reply {
        id: id.clone(),
        parent_comment_id: comment_id.to_string(),
        content,
        author_id: identity.uid.clone(),
        author_name: identity.name(),
        author_email: identity.email.clone(),
        created_at: now_millis(),
        likes: 0,
    };

    write_counted(
        store,
        &paths::reply(post_id, comment_id, &id),
        &reply,
        &paths::comment(post_id, comment_id),
        CounterField::Replies,
    )
    .await?;

    tracing::info!(post_id, comment_id, reply_id = %id, "Reply created");
    Ok(reply)
}

/// Write `value` and bump the parent's counter. The write is undone when
/// the parent vanished in between.
async fn write_counted<T: Serialize>(
    store: &DocumentStore,
    path: &str,
    value: &T,
    parent_path: &str,
    field: CounterField,
) -> Result<(), AppError> {
    store.write(path, value).await?;
    if let Err(e) = counters::adjust(store, parent_path, field, CounterChange::Increment).await {
        store.delete(path).await?;
        return Err(e);
    }
    Ok(())
}

/// Replies to a comment, oldest first.
pub async fn list_replies(session: &Session, post_id: &str, comment_id: &str) -> Result<Vec<Reply>, AppError> {
    check_id(post_id, "post")?;
    check_id(comment_id, "comment")?;
    let mut replies: Vec<Reply> = session
        .store()
        .list_as::<Reply>(&paths::replies(post_id, comment_id))
        .await?
        .into_iter()
        .map(|(id, mut reply)| {
            reply.id = id;
            reply.parent_comment_id = comment_id.to_string();
            reply
        })
        .collect();
    replies.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    Ok(replies)
}

/// The post's denormalized comment counter.
pub async fn comment_count(session: &Session, post_id: &str) -> Result<u64, AppError> {
    check_id(post_id, "post")?;
    counters::read(session.store(), &paths::post(post_id), CounterField::Comments).await
}

fn check_id(id: &str, what: &str) -> Result<(), AppError> {
    if paths::is_valid_key(id) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid {} id", what)))
    }
}

fn newest_first(entries: Vec<(String, Comment)>) -> Vec<Comment> {
    let mut comments: Vec<Comment> = entries
        .into_iter()
        .map(|(id, mut comment)| {
            comment.id = id;
            comment
        })
        .collect();
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
    comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_store, DocumentStore};
    use crate::models::CreatePostRequest;
    use crate::posts;
    use crate::session::Identity;
    use std::sync::{Arc, Mutex};

    fn session_for(store: &DocumentStore, uid: &str) -> Session {
        Session::new(store.clone(), Identity::new(uid, format!("{uid}@example.com"), None)).unwrap()
    }

    fn body(content: &str) -> CommentRequest {
        CommentRequest {
            content: content.to_string(),
        }
    }

    async fn post_by(session: &Session) -> Post {
        posts::create_post(
            session,
            CreatePostRequest {
                content: "a post".into(),
                link_url: None,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_comment_increments_counter_and_notifies() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let bob = session_for(&store, "bob");
        let post = post_by(&alice).await;

        let comment = create_comment(&bob, &post.id, body(" nice ")).await.unwrap();
        assert_eq!(comment.content, "nice");
        assert_eq!(comment_count(&bob, &post.id).await.unwrap(), 1);

        let inbox = store.list("notifications/alice").await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].value["type"], "comment");
        assert_eq!(inbox[0].value["commentId"], comment.id.as_str());

        // Commenting on your own post sends nothing
        create_comment(&alice, &post.id, body("thanks")).await.unwrap();
        assert!(store.list("notifications/alice").await.unwrap().len() == 1);
        assert_eq!(comment_count(&alice, &post.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let (store, _dir) = test_store().await;
        let bob = session_for(&store, "bob");

        let err = create_comment(&bob, "ghost", body("hello")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.read_tree("comments/ghost").await.unwrap(), None);

        let err = create_comment(&bob, "ghost", body("  ")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_comments_newest_first() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let post = post_by(&alice).await;

        create_comment(&alice, &post.id, body("first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        create_comment(&alice, &post.id, body("second")).await.unwrap();

        let contents: Vec<String> = list_comments(&alice, &post.id)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn test_update_comment_marks_edited() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let bob = session_for(&store, "bob");
        let post = post_by(&alice).await;
        let comment = create_comment(&bob, &post.id, body("typo")).await.unwrap();

        let err = update_comment(&alice, &post.id, &comment.id, body("nope")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let edited = update_comment(&bob, &post.id, &comment.id, body("fixed")).await.unwrap();
        assert_eq!(edited.content, "fixed");
        assert!(edited.edited);
        assert!(edited.edited_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_comment_cascades_and_decrements() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let bob = session_for(&store, "bob");
        let post = post_by(&alice).await;
        let comment = create_comment(&bob, &post.id, body("bye")).await.unwrap();
        create_reply(&alice, &post.id, &comment.id, body("reply")).await.unwrap();
        crate::likes::toggle_comment_like(&alice, &post.id, &comment.id)
            .await
            .unwrap();

        delete_comment(&bob, &post.id, &comment.id).await.unwrap();

        assert_eq!(comment_count(&alice, &post.id).await.unwrap(), 0);
        assert!(list_replies(&alice, &post.id, &comment.id).await.unwrap().is_empty());
        assert!(!crate::likes::has_liked_comment(&alice, &post.id, &comment.id)
            .await
            .unwrap());
        assert!(get_comment(&alice, &post.id, &comment.id)
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_replies_oldest_first_and_counted() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let post = post_by(&alice).await;
        let comment = create_comment(&alice, &post.id, body("parent")).await.unwrap();

        create_reply(&alice, &post.id, &comment.id, body("one")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        create_reply(&alice, &post.id, &comment.id, body("two")).await.unwrap();

        let replies = list_replies(&alice, &post.id, &comment.id).await.unwrap();
        let contents: Vec<&str> = replies.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
        assert!(replies.iter().all(|r| r.parent_comment_id == comment.id));

        let parent = get_comment(&alice, &post.id, &comment.id).await.unwrap();
        assert_eq!(parent.replies, 2);

        let err = create_reply(&alice, &post.id, "missing", body("x")).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_reply_removed_when_parent_vanishes() {
        let (store, _dir) = test_store().await;
        let reply_path = paths::reply("p1", "gone", "r1");

        let err = write_counted(
            &store,
            &reply_path,
            &serde_json::json!({"content": "late"}),
            &paths::comment("p1", "gone"),
            CounterField::Replies,
        )
        .await
        .unwrap_err();

        assert!(err.is_not_found());
        assert!(!store.exists(&reply_path).await.unwrap());
        assert!(store.list(&paths::replies("p1", "gone")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watch_comments() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice");
        let post = post_by(&alice).await;
        let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        let subscription = watch_comments(&alice, &post.id, move |comments| {
            sink.lock().unwrap().push(comments.len());
        })
        .await
        .unwrap();
        alice.hold(subscription);

        create_comment(&alice, &post.id, body("hi")).await.unwrap();
        assert_eq!(alice.end(), 1);

        assert_eq!(*seen.lock().unwrap(), vec![0, 1]);
    }
}

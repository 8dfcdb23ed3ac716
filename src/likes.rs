//! Like toggling for posts and comments.
//!
//! A like is a record at `likes/{postId}/{userId}` (or
//! `commentLikes/{postId}/{commentId}/{userId}`); its presence is the
//! liked state. Toggling flips the record and moves the parent's `likes`
//! counter in the same direction.

use std::collections::BTreeMap;

use crate::counters::{self, CounterChange, CounterField};
use crate::db::paths;
use crate::errors::AppError;
use crate::format::now_millis;
use crate::models::{LikeOutcome, LikeRecord, LikeStatus, NotificationType, Post, PostLikes};
use crate::notifications;
use crate::session::Session;

/// Like or unlike a post as the session user.
pub async fn toggle_post_like(session: &Session, post_id: &str) -> Result<LikeOutcome, AppError> {
    check_key(post_id, "post")?;
    let store = session.store();
    let post_path = paths::post(post_id);

    let post: Post = store
        .read_as(&post_path)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

    let like_path = paths::like(post_id, session.uid());
    let outcome = toggle(session, &like_path, &post_path).await?;

    if outcome.liked && post.author_id != session.uid() {
        notifications::notify_best_effort(
            session,
            &post.author_id,
            NotificationType::Like,
            Some(post_id),
            None,
            "liked your post",
        )
        .await;
    }

    tracing::info!(post_id, uid = session.uid(), liked = outcome.liked, "Post like toggled");
    Ok(outcome)
}

/// Like or unlike a comment as the session user.
pub async fn toggle_comment_like(
    session: &Session,
    post_id: &str,
    comment_id: &str,
) -> Result<LikeOutcome, AppError> {
    check_key(post_id, "post")?;
    check_key(comment_id, "comment")?;
    let comment_path = paths::comment(post_id, comment_id);

    if !session.store().exists(&comment_path).await? {
        return Err(AppError::NotFound(format!("Comment {} not found", comment_id)));
    }

    let like_path = paths::comment_like(post_id, comment_id, session.uid());
    let outcome = toggle(session, &like_path, &comment_path).await?;

    tracing::info!(post_id, comment_id, liked = outcome.liked, "Comment like toggled");
    Ok(outcome)
}

async fn toggle(
    session: &Session,
    like_path: &str,
    content_path: &str,
) -> Result<LikeOutcome, AppError> {
    let store = session.store();

    if store.exists(like_path).await? {
        store.delete(like_path).await?;
        let new_likes =
            counters::adjust(store, content_path, CounterField::Likes, CounterChange::Decrement)
                .await?;
        return Ok(LikeOutcome {
            liked: false,
            new_likes,
        });
    }

    let record = LikeRecord {
        user_id: session.uid().to_string(),
        timestamp: now_millis(),
    };
    store.write(like_path, &record).await?;

    match counters::adjust(store, content_path, CounterField::Likes, CounterChange::Increment).await
    {
        Ok(new_likes) => Ok(LikeOutcome {
            liked: true,
            new_likes,
        }),
        Err(e) => {
            // Content vanished mid-toggle; do not leave an orphaned like behind.
            store.delete(like_path).await?;
            Err(e)
        }
    }
}

/// Whether the session user likes the post. Pure read.
pub async fn has_liked(session: &Session, post_id: &str) -> Result<bool, AppError> {
    check_key(post_id, "post")?;
    session
        .store()
        .exists(&paths::like(post_id, session.uid()))
        .await
}

/// Whether the session user likes the comment. Pure read.
pub async fn has_liked_comment(
    session: &Session,
    post_id: &str,
    comment_id: &str,
) -> Result<bool, AppError> {
    check_key(post_id, "post")?;
    check_key(comment_id, "comment")?;
    session
        .store()
        .exists(&paths::comment_like(post_id, comment_id, session.uid()))
        .await
}

/// The session user's liked state of a post, with its like counter.
pub async fn post_like_status(session: &Session, post_id: &str) -> Result<LikeStatus, AppError> {
    Ok(LikeStatus {
        liked: has_liked(session, post_id).await?,
        likes: post_like_count(session, post_id).await?,
    })
}

/// The session user's liked state of a comment, with its like counter.
pub async fn comment_like_status(
    session: &Session,
    post_id: &str,
    comment_id: &str,
) -> Result<LikeStatus, AppError> {
    let liked = has_liked_comment(session, post_id, comment_id).await?;
    let likes = counters::read(
        session.store(),
        &paths::comment(post_id, comment_id),
        CounterField::Likes,
    )
    .await?;
    Ok(LikeStatus { liked, likes })
}

/// Liked state of several posts at once.
pub async fn check_multiple(
    session: &Session,
    post_ids: &[String],
) -> Result<BTreeMap<String, bool>, AppError> {
    let mut results = BTreeMap::new();
    for post_id in post_ids {
        results.insert(post_id.clone(), has_liked(session, post_id).await?);
    }
    Ok(results)
}

/// Every like record on a post.
pub async fn post_likes(session: &Session, post_id: &str) -> Result<PostLikes, AppError> {
    check_key(post_id, "post")?;
    let likes: Vec<LikeRecord> = session
        .store()
        .list_as::<LikeRecord>(&paths::likes(post_id))
        .await?
        .into_iter()
        .map(|(user_id, record)| LikeRecord {
            user_id,
            timestamp: record.timestamp,
        })
        .collect();

    Ok(PostLikes {
        count: likes.len(),
        likes,
    })
}

/// The post's denormalized like counter; 0 when the post is absent.
pub async fn post_like_count(session: &Session, post_id: &str) -> Result<u64, AppError> {
    check_key(post_id, "post")?;
    counters::read(session.store(), &paths::post(post_id), CounterField::Likes).await
}

/// Posts liked by `user_id`, newest first.
pub async fn liked_posts(session: &Session, user_id: &str) -> Result<Vec<Post>, AppError> {
    check_key(user_id, "user")?;
    let store = session.store();

    let records = store.find_by_key(paths::LIKES, user_id).await?;
    let mut posts = Vec::new();
    for (path, _) in records {
        let Some((parent, _)) = paths::split(&path) else {
            continue;
        };
        let Some((_, post_id)) = paths::split(parent) else {
            continue;
        };
        if let Some(mut post) = store.read_as::<Post>(&paths::post(post_id)).await? {
            post.id = post_id.to_string();
            posts.push(post);
        }
    }

    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(posts)
}

fn check_key(key: &str, what: &str) -> Result<(), AppError> {
    if paths::is_valid_key(key) {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid {} id", what)))
    }
}

//! User profiles at `users/{uid}`.

use serde_json::{Map, Value};

use crate::db::paths;
use crate::errors::AppError;
use crate::format::now_millis;
use crate::models::{Post, ProfileStats, UpdateProfileRequest, UserProfile};
use crate::session::Session;

pub const MAX_BIO_CHARS: usize = 160;

/// Write or refresh the session user's profile with the current login time.
pub async fn record_sign_in(session: &Session) -> Result<(), AppError> {
    let store = session.store();
    let path = paths::user(session.uid());
    let now = now_millis();

    if store.exists(&path).await? {
        let mut fields = Map::new();
        fields.insert("email".to_string(), Value::String(session.identity().email.clone()));
        fields.insert("lastLogin".to_string(), Value::from(now));
        store.patch(&path, fields).await?;
    } else {
        let profile = UserProfile {
            last_login: Some(now),
            ..new_profile(session, now)
        };
        store.write(&path, &profile).await?;
    }

    tracing::debug!(uid = session.uid(), "Sign-in recorded");
    Ok(())
}

/// Fetch a profile. The session user's own profile is created on first view.
pub async fn get_or_create_profile(session: &Session, uid: &str) -> Result<UserProfile, AppError> {
    if !paths::is_valid_key(uid) {
        return Err(AppError::Validation("Invalid user id".to_string()));
    }
    let store = session.store();
    let path = paths::user(uid);

    if let Some(mut profile) = store.read_as::<UserProfile>(&path).await? {
        profile.uid = uid.to_string();
        return Ok(profile);
    }

    if uid != session.uid() {
        return Err(AppError::NotFound(format!("User {} not found", uid)));
    }

    let profile = new_profile(session, now_millis());
    store.write(&path, &profile).await?;
    tracing::info!(uid, "Profile created");
    Ok(profile)
}

/// Edit the session user's display name and bio.
pub async fn update_profile(
    session: &Session,
    request: UpdateProfileRequest,
) -> Result<UserProfile, AppError> {
    let display_name = request.display_name.trim();
    if display_name.is_empty() {
        return Err(AppError::Validation("Display name is required".to_string()));
    }
    let bio = request.bio.trim();
    if bio.chars().count() > MAX_BIO_CHARS {
        return Err(AppError::Validation(format!(
            "Bio must be at most {} characters",
            MAX_BIO_CHARS
        )));
    }

    // Make sure createdAt and email exist before merging the edit.
    get_or_create_profile(session, session.uid()).await?;

    let mut fields = Map::new();
    fields.insert("displayName".to_string(), Value::String(display_name.to_string()));
    fields.insert("bio".to_string(), Value::String(bio.to_string()));
    session.store().patch(&paths::user(session.uid()), fields).await?;

    tracing::info!(uid = session.uid(), "Profile updated");
    get_or_create_profile(session, session.uid()).await
}

/// Number of posts by `uid` and the likes they have received.
pub async fn profile_stats(session: &Session, uid: &str) -> Result<ProfileStats, AppError> {
    let posts = session.store().list_as::<Post>(paths::POSTS).await?;

    Ok(posts
        .iter()
        .filter(|(_, post)| post.author_id == uid)
        .fold(ProfileStats::default(), |mut stats, (_, post)| {
            stats.posts += 1;
            stats.likes += post.likes;
            stats
        }))
}

fn new_profile(session: &Session, now: i64) -> UserProfile {
    let identity = session.identity();
    UserProfile {
        uid: identity.uid.clone(),
        email: identity.email.clone(),
        display_name: identity.name(),
        bio: String::new(),
        created_at: now,
        last_login: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{test_store, DocumentStore};
    use crate::session::Identity;
    use serde_json::json;

    fn session_for(store: &DocumentStore, uid: &str, name: Option<&str>) -> Session {
        Session::new(
            store.clone(),
            Identity::new(uid, format!("{uid}@example.com"), name.map(str::to_string)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_profile_created_lazily() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice", None);

        assert!(!store.exists("users/alice").await.unwrap());
        let profile = get_or_create_profile(&alice, "alice").await.unwrap();
        assert_eq!(profile.display_name, "alice");
        assert_eq!(profile.email, "alice@example.com");
        assert!(store.exists("users/alice").await.unwrap());

        let again = get_or_create_profile(&alice, "alice").await.unwrap();
        assert_eq!(again.created_at, profile.created_at);
    }

    #[tokio::test]
    async fn test_other_users_profile_not_created() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice", None);

        let err = get_or_create_profile(&alice, "bob").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.exists("users/bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_profile_validation() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice", Some("Alice"));

        let err = update_profile(
            &alice,
            UpdateProfileRequest {
                display_name: "  ".into(),
                bio: String::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = update_profile(
            &alice,
            UpdateProfileRequest {
                display_name: "Alice".into(),
                bio: "x".repeat(MAX_BIO_CHARS + 1),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = update_profile(
            &alice,
            UpdateProfileRequest {
                display_name: " Alice B ".into(),
                bio: "Hello there".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.display_name, "Alice B");
        assert_eq!(updated.bio, "Hello there");
    }

    #[tokio::test]
    async fn test_sign_in_records_last_login() {
        let (store, _dir) = test_store().await;
        let identity = Identity::new("alice", "alice@example.com", Some("Alice".into()));

        let session = Session::sign_in(store.clone(), identity.clone()).await.unwrap();
        let profile = get_or_create_profile(&session, "alice").await.unwrap();
        assert_eq!(profile.display_name, "Alice");
        let first_login = profile.last_login.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let session = Session::sign_in(store.clone(), identity).await.unwrap();
        let profile = get_or_create_profile(&session, "alice").await.unwrap();
        assert!(profile.last_login.unwrap() > first_login);
        assert!(profile.created_at <= first_login);
    }

    #[tokio::test]
    async fn test_profile_stats_counts_own_posts() {
        let (store, _dir) = test_store().await;
        let alice = session_for(&store, "alice", None);

        for (id, author, likes) in [("p1", "alice", 3), ("p2", "alice", 2), ("p3", "bob", 7)] {
            store
                .write(
                    &paths::post(id),
                    &json!({"authorId": author, "authorName": author, "content": "x", "createdAt": 1, "likes": likes}),
                )
                .await
                .unwrap();
        }

        let stats = profile_stats(&alice, "alice").await.unwrap();
        assert_eq!(stats, ProfileStats { posts: 2, likes: 5 });
    }
}

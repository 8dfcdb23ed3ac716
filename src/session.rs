//! Signed-in session context.
//!
//! Every feed operation takes a [`Session`]: the identity the upstream
//! auth provider vouched for, plus the store it acts on. Subscriptions
//! opened on behalf of a view can be handed to the session, which
//! releases them all at sign-out.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::db::{paths, DocumentStore, Subscription};
use crate::errors::AppError;

/// Identity of the signed-in user, as supplied by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Identity {
    pub fn new(uid: impl Into<String>, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            uid: uid.into(),
            email: email.into(),
            display_name,
        }
    }

    /// Display name, falling back to the local part of the email.
    pub fn name(&self) -> String {
        if let Some(name) = self.display_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return name.to_string();
            }
        }
        match self.email.split('@').next() {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "User".to_string(),
        }
    }
}

/// Per-user context passed to every operation.
pub struct Session {
    identity: Identity,
    store: DocumentStore,
    subscriptions: Mutex<Vec<Subscription>>,
}

impl Session {
    /// Wrap an already-authenticated identity.
    pub fn new(store: DocumentStore, identity: Identity) -> Result<Self, AppError> {
        if !paths::is_valid_key(&identity.uid) {
            return Err(AppError::Unauthorized(
                "A signed-in user is required".to_string(),
            ));
        }
        Ok(Self {
            identity,
            store,
            subscriptions: Mutex::new(Vec::new()),
        })
    }

    /// Start a session at sign-in, recording the login on the user's profile.
    pub async fn sign_in(store: DocumentStore, identity: Identity) -> Result<Self, AppError> {
        let session = Self::new(store, identity)?;
        crate::profile::record_sign_in(&session).await?;
        tracing::info!(uid = %session.identity.uid, "Session started");
        Ok(session)
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Keep `subscription` alive until the session ends.
    pub fn hold(&self, subscription: Subscription) {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(subscription);
    }

    pub fn held_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Sign out: release every held subscription. Returns how many were released.
    pub fn end(self) -> usize {
        let subscriptions = self
            .subscriptions
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let released = subscriptions
            .into_iter()
            .map(Subscription::unsubscribe)
            .filter(|removed| *removed)
            .count();

        tracing::info!(uid = %self.identity.uid, released, "Session ended");
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_store;

    #[test]
    fn test_identity_name_fallbacks() {
        let named = Identity::new("u1", "alice@example.com", Some("Alice".into()));
        assert_eq!(named.name(), "Alice");

        let unnamed = Identity::new("u1", "alice@example.com", None);
        assert_eq!(unnamed.name(), "alice");

        let blank = Identity::new("u1", "", Some("  ".into()));
        assert_eq!(blank.name(), "User");
    }

    #[tokio::test]
    async fn test_session_requires_uid() {
        let (store, _dir) = test_store().await;

        let err = Session::new(store, Identity::new("", "a@b.com", None)).err();
        assert!(matches!(err, Some(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_end_releases_held_subscriptions() {
        let (store, _dir) = test_store().await;
        let session = Session::new(store.clone(), Identity::new("u1", "a@b.com", None)).unwrap();

        let first = store.subscribe("posts", |_| {}, |_| {}).await.unwrap();
        let second = store.subscribe("notifications/u1", |_| {}, |_| {}).await.unwrap();
        session.hold(first);
        session.hold(second);
        assert_eq!(store.subscriber_count(), 2);
        assert_eq!(session.held_subscriptions(), 2);

        assert_eq!(session.end(), 2);
        assert_eq!(store.subscriber_count(), 0);
    }
}

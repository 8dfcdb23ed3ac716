//! Per-user notification inbox at `notifications/{recipientId}/{id}`.

use serde_json::{Map, Value};

use crate::db::{paths, Subscription};
use crate::errors::AppError;
use crate::format::now_millis;
use crate::models::{CreateNotificationRequest, Notification, NotificationType};
use crate::session::Session;

/// Send a notification from the session user to `request.recipient_id`.
pub async fn create_notification(
    session: &Session,
    request: CreateNotificationRequest,
) -> Result<Notification, AppError> {
    if !paths::is_valid_key(&request.recipient_id) {
        return Err(AppError::Validation("Invalid recipient id".to_string()));
    }
    if request.recipient_id == session.uid() {
        return Err(AppError::Validation(
            "Cannot send a notification to yourself".to_string(),
        ));
    }
    if request.message.trim().is_empty() {
        return Err(AppError::Validation("Notification message is required".to_string()));
    }

    let store = session.store();
    let id = store.push_id();
    let notification = Notification {
        id: id.clone(),
        recipient_id: request.recipient_id,
        kind: request.kind,
        sender_id: session.uid().to_string(),
        sender_name: session.identity().name(),
        post_id: request.post_id,
        comment_id: request.comment_id,
        message: request.message,
        created_at: now_millis(),
        read: false,
    };

    store
        .write(&paths::notification(&notification.recipient_id, &id), &notification)
        .await?;

    tracing::info!(
        id = %id,
        recipient = %notification.recipient_id,
        kind = notification.kind.as_str(),
        "Notification created"
    );
    Ok(notification)
}

/// Fire-and-forget variant used as a side effect of likes and comments.
/// Failures are logged, never returned.
pub(crate) async fn notify_best_effort(
    session: &Session,
    recipient_id: &str,
    kind: NotificationType,
    post_id: Option<&str>,
    comment_id: Option<&str>,
    message: &str,
) {
    let request = CreateNotificationRequest {
        recipient_id: recipient_id.to_string(),
        kind,
        post_id: post_id.map(str::to_string),
        comment_id: comment_id.map(str::to_string),
        message: message.to_string(),
    };

    if let Err(e) = create_notification(session, request).await {
        tracing::warn!(recipient_id, kind = kind.as_str(), "Failed to send notification: {}", e);
    }
}

/// The session user's notifications, newest first.
pub async fn list_notifications(session: &Session) -> Result<Vec<Notification>, AppError> {
    let entries = session
        .store()
        .list_as::<Notification>(&paths::notifications(session.uid()))
        .await?;
    Ok(sorted(session.uid(), entries))
}

/// Live view of the session user's inbox, newest first.
pub async fn watch_notifications<F>(session: &Session, on_change: F) -> Result<Subscription, AppError>
where
    F: Fn(Vec<Notification>) + Send + Sync + 'static,
{
    let uid = session.uid().to_string();
    session
        .store()
        .subscribe(
            &paths::notifications(session.uid()),
            move |snapshot| on_change(from_snapshot(&uid, snapshot)),
            |e| tracing::error!("Notification subscription failed: {}", e),
        )
        .await
}

/// Mark one of the session user's notifications read.
pub async fn mark_read(session: &Session, notification_id: &str) -> Result<(), AppError> {
    if !paths::is_valid_key(notification_id) {
        return Err(AppError::Validation("Invalid notification id".to_string()));
    }
    let store = session.store();
    let path = paths::notification(session.uid(), notification_id);

    if !store.exists(&path).await? {
        return Err(AppError::NotFound(format!(
            "Notification {} not found",
            notification_id
        )));
    }

    store.patch(&path, read_flag()).await?;
    tracing::debug!(notification_id, "Notification marked read");
    Ok(())
}

/// Mark every unread notification read. Returns how many changed.
pub async fn mark_all_read(session: &Session) -> Result<usize, AppError> {
    let store = session.store();
    let unread: Vec<String> = list_notifications(session)
        .await?
        .into_iter()
        .filter(|n| !n.read)
        .map(|n| n.id)
        .collect();

    for id in &unread {
        store
            .patch(&paths::notification(session.uid(), id), read_flag())
            .await?;
    }

    tracing::info!(uid = session.uid(), count = unread.len(), "Notifications marked read");
    Ok(unread.len())
}

pub async fn unread_count(session: &Session) -> Result<usize, AppError> {
    Ok(list_notifications(session)
        .await?
        .iter()
        .filter(|n| !n.read)
        .count())
}

fn read_flag() -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("read".to_string(), Value::Bool(true));
    fields
}

fn sorted(recipient_id: &str, entries: Vec<(String, Notification)>) -> Vec<Notification> {
    let mut notifications: Vec<Notification> = entries
        .into_iter()
        .map(|(id, mut n)| {
            n.id = id;
            n.recipient_id = recipient_id.to_string();
            n
        })
        .collect();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    notifications
}

fn from_snapshot(recipient_id: &str, snapshot: Option<Value>) -> Vec<Notification> {
    let Some(Value::Object(children)) = snapshot else {
        return Vec::new();
    };
    let entries = children
        .into_iter()
        .filter_map(|(id, value)| serde_json::from_value(value).ok().map(|n| (id, n)))
        .collect();
    sorted(recipient_id, entries)
}

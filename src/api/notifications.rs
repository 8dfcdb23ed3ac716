//! Notification API endpoints. Read-state changes only touch the caller's inbox.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{session, success, ApiResult};
use crate::models::{CreateNotificationRequest, Notification};
use crate::session::Identity;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountResponse {
    pub count: usize,
}

/// GET /api/notifications - The caller's inbox, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Vec<Notification>> {
    let session = session(&state, identity)?;
    success(crate::notifications::list_notifications(&session).await?)
}

/// POST /api/notifications - Notify another user.
pub async fn create_notification(
    State(state): State<AppState>,
    identity: Identity,
    Json(request): Json<CreateNotificationRequest>,
) -> ApiResult<Notification> {
    let session = session(&state, identity)?;
    success(crate::notifications::create_notification(&session, request).await?)
}

/// POST /api/notifications/:id/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let session = session(&state, identity)?;
    crate::notifications::mark_read(&session, &id).await?;
    success(())
}

/// POST /api/notifications/read-all
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<CountResponse> {
    let session = session(&state, identity)?;
    let count = crate::notifications::mark_all_read(&session).await?;
    success(CountResponse { count })
}

/// GET /api/notifications/unread-count
pub async fn unread_notification_count(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<CountResponse> {
    let session = session(&state, identity)?;
    let count = crate::notifications::unread_count(&session).await?;
    success(CountResponse { count })
}

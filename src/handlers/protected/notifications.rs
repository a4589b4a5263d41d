// handlers/protected/notifications.rs - the caller's inbox
//
// Every read and write is scoped to the authenticated user; another user's
// notification id answers 404. Sending is admin only.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::Notification;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::notification_service::{ListNotificationsQuery, NotifyInput};
use crate::state::AppState;
use crate::types::NotificationKind;

use super::path_id;

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub kind: Option<NotificationKind>,
    pub title: String,
    pub message: String,
    /// Also deliver by email to the recipient's address
    #[serde(default)]
    pub email: bool,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

/// GET /api/notifications?unread_only=&page=&limit=
pub async fn list(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListNotificationsQuery>,
) -> ApiResult<Vec<Notification>> {
    Ok(ApiResponse::success(
        state.notifications.list_for_user(auth.user_id, query).await?,
    ))
}

/// POST /api/notifications - admin sends to any user
pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<SendRequest>, JsonRejection>,
) -> ApiResult<Notification> {
    auth.require_admin()?;
    let Json(request) = payload?;

    let recipient = state.users.find_one(&request.user_id.to_string()).await?;
    let email_to = request.email.then_some(recipient.email.as_str());

    let input = NotifyInput {
        user_id: recipient.id,
        kind: request.kind.unwrap_or(NotificationKind::Info),
        title: request.title,
        message: request.message,
    };
    Ok(ApiResponse::created(state.notifications.notify(input, email_to).await?))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<UnreadCount> {
    let unread = state.notifications.unread_count(auth.user_id).await?;
    Ok(ApiResponse::success(UnreadCount { unread }))
}

/// PUT /api/notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Notification> {
    let id = path_id(&id, "notification")?;
    Ok(ApiResponse::success(state.notifications.mark_read(id, auth.user_id).await?))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<MarkedRead> {
    let updated = state.notifications.mark_all_read(auth.user_id).await?;
    Ok(ApiResponse::success(MarkedRead { updated }))
}

/// DELETE /api/notifications/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let id = path_id(&id, "notification")?;
    state.notifications.delete(id, auth.user_id).await?;
    Ok(ApiResponse::no_content())
}

// handlers/protected/channels.rs - chat channels
//
// Any active user may create, list and join channels. Reading and posting
// messages requires membership (403 otherwise).

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Channel, Message};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::channel_service::{CreateChannelInput, ListMessagesQuery};
use crate::state::AppState;

use super::path_id;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct Membership {
    pub channel_id: Uuid,
    pub member: bool,
    pub changed: bool,
}

/// GET /api/channels
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<Channel>> {
    Ok(ApiResponse::success(state.channels.list_channels().await?))
}

/// POST /api/channels - the creator joins automatically
pub async fn create(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreateChannelInput>, JsonRejection>,
) -> ApiResult<Channel> {
    let Json(input) = payload?;
    Ok(ApiResponse::created(state.channels.create_channel(auth.user_id, input).await?))
}

/// GET /api/channels/:id
pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Channel> {
    let id = path_id(&id, "channel")?;
    Ok(ApiResponse::success(state.channels.get_channel(id).await?))
}

/// POST /api/channels/:id/join
pub async fn join(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Membership> {
    let channel_id = path_id(&id, "channel")?;
    let changed = state.channels.join(channel_id, auth.user_id).await?;
    Ok(ApiResponse::success(Membership {
        channel_id,
        member: true,
        changed,
    }))
}

/// POST /api/channels/:id/leave
pub async fn leave(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Membership> {
    let channel_id = path_id(&id, "channel")?;
    let changed = state.channels.leave(channel_id, auth.user_id).await?;
    Ok(ApiResponse::success(Membership {
        channel_id,
        member: false,
        changed,
    }))
}

/// GET /api/channels/:id/members
pub async fn members(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Uuid>> {
    let id = path_id(&id, "channel")?;
    Ok(ApiResponse::success(state.channels.members(id).await?))
}

/// GET /api/channels/:id/messages?before=&limit=
pub async fn messages(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    Query(query): Query<ListMessagesQuery>,
) -> ApiResult<Vec<Message>> {
    let id = path_id(&id, "channel")?;
    Ok(ApiResponse::success(
        state.channels.list_messages(id, auth.user_id, query).await?,
    ))
}

/// POST /api/channels/:id/messages
pub async fn post_message(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> ApiResult<Message> {
    let id = path_id(&id, "channel")?;
    let Json(request) = payload?;
    Ok(ApiResponse::created(
        state.channels.post_message(id, auth.user_id, &request.body).await?,
    ))
}

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::UpdateUserInput;
use crate::state::AppState;
use crate::types::{UserRole, UserStatus};

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct RoleBody {
    pub role: UserRole,
}

/// GET /api/users/:id
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<User> {
    auth.require_admin()?;
    Ok(ApiResponse::success(state.users.find_one(&id).await?))
}

/// PATCH /api/users/:id - email, name and password
pub async fn patch(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserInput>, JsonRejection>,
) -> ApiResult<User> {
    auth.require_admin()?;
    let Json(input) = payload?;
    Ok(ApiResponse::success(state.users.update_user(&id, input).await?))
}

/// DELETE /api/users/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    auth.require_admin()?;
    if id == auth.user_id.to_string() {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    state.users.remove_user(&id).await?;
    Ok(ApiResponse::no_content())
}

/// PUT /api/users/:id/status - notifies the user
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<StatusBody>, JsonRejection>,
) -> ApiResult<User> {
    auth.require_admin()?;
    let Json(body) = payload?;
    Ok(ApiResponse::success(state.users.update_status(&id, body.status).await?))
}

/// PUT /api/users/:id/role - notifies the user
pub async fn role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<RoleBody>, JsonRejection>,
) -> ApiResult<User> {
    auth.require_admin()?;
    let Json(body) = payload?;
    Ok(ApiResponse::success(state.users.update_role(&id, body.role).await?))
}

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};

use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::user_service::{CreateUserInput, ListUsersQuery, UserPage, UserStats};
use crate::state::AppState;

/// GET /api/users?page=&limit=&role=&status=&search=
pub async fn get(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<UserPage> {
    auth.require_admin()?;
    Ok(ApiResponse::success(state.users.find_all(query).await?))
}

/// POST /api/users - create an account with any role and status
pub async fn post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<CreateUserInput>, JsonRejection>,
) -> ApiResult<User> {
    auth.require_admin()?;
    let Json(input) = payload?;
    Ok(ApiResponse::created(state.users.create_user(input).await?))
}

/// GET /api/users/stats
pub async fn stats(State(state): State<AppState>, Extension(auth): Extension<AuthUser>) -> ApiResult<UserStats> {
    auth.require_admin()?;
    Ok(ApiResponse::success(state.users.stats().await?))
}

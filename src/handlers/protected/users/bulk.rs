// handlers/protected/users/bulk.rs - fail-independent bulk updates
//
// Both endpoints answer 200 once the request itself is accepted; per-item
// failures are reported inside the result, never as the response status.
//
// ```json
// {
//   "success": true,
//   "data": {
//     "success": 2,
//     "failed": 1,
//     "results": [
//       { "id": "...", "email": "...", "status": "suspended", ... },
//       { "id": "user-2", "error": "Invalid user id 'user-2'" },
//       { "id": "...", "email": "...", "status": "suspended", ... }
//     ]
//   }
// }
// ```

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::bulk::BulkOperationResult;
use crate::database::models::User;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::state::AppState;
use crate::types::{UserRole, UserStatus};

#[derive(Debug, Deserialize)]
pub struct BulkStatusRequest {
    pub ids: Vec<String>,
    pub status: UserStatus,
}

#[derive(Debug, Deserialize)]
pub struct BulkRoleRequest {
    pub ids: Vec<String>,
    pub role: UserRole,
}

/// POST /api/users/bulk/status
pub async fn status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<BulkStatusRequest>, JsonRejection>,
) -> ApiResult<BulkOperationResult<User>> {
    auth.require_admin()?;
    let Json(request) = payload?;

    let result = state.users.bulk_update_status(&request.ids, request.status).await?;
    tracing::info!(
        "Bulk status by {}: {} succeeded, {} failed",
        auth.user_id,
        result.success,
        result.failed
    );
    Ok(ApiResponse::success(result))
}

/// POST /api/users/bulk/role
pub async fn role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<BulkRoleRequest>, JsonRejection>,
) -> ApiResult<BulkOperationResult<User>> {
    auth.require_admin()?;
    let Json(request) = payload?;

    let result = state.users.bulk_update_role(&request.ids, request.role).await?;
    tracing::info!(
        "Bulk role by {}: {} succeeded, {} failed",
        auth.user_id,
        result.success,
        result.failed
    );
    Ok(ApiResponse::success(result))
}

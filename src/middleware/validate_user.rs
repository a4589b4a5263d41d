use axum::{
    extract::{Extension, Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::ApiError;
use crate::services::ServiceError;
use crate::state::AppState;
use crate::types::UserStatus;

use super::auth::AuthUser;

/// Middleware that re-checks the JWT subject against storage.
/// Tokens outlive role and status changes, so the stored role replaces the
/// one in the token and only active accounts get through.
pub async fn validate_user_middleware(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match state.users.find_one(&auth_user.user_id.to_string()).await {
        Ok(user) => user,
        Err(ServiceError::NotFound(_)) => {
            return Err(ApiError::unauthorized("User no longer exists"));
        }
        Err(e) => return Err(e.into()),
    };

    if user.status != UserStatus::Active {
        tracing::debug!("Rejected {} user {}", user.status, user.id);
        return Err(ApiError::forbidden(format!("Account is {}", user.status)));
    }

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        email: user.email,
        role: user.role,
    });
    Ok(next.run(request).await)
}

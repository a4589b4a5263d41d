// handlers/public/auth.rs - token acquisition
//
// POST /auth/register creates a regular active account and signs it in.
// POST /auth/login exchanges email + password for a JWT.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{generate_jwt, Claims};
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::user_service::CreateUserInput;
use crate::state::AppState;
use crate::types::{UserRole, UserStatus};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub user: User,
    pub expires_in: i64,
}

impl TokenResponse {
    fn issue(user: User) -> Result<Self, ApiError> {
        let claims = Claims::for_user(&user);
        let token = generate_jwt(&claims)?;
        Ok(Self {
            token,
            expires_in: claims.expires_in(),
            user,
        })
    }
}

/// POST /auth/login
///
/// ```json
/// { "email": "ada@example.com", "password": "correct horse" }
/// ```
///
/// 401 for unknown email or wrong password, 403 for accounts that are not active.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let Json(request) = payload?;

    let user = state.users.authenticate(&request.email, &request.password).await?;
    tracing::info!("User {} signed in", user.id);

    Ok(ApiResponse::success(TokenResponse::issue(user)?))
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<TokenResponse> {
    let Json(request) = payload?;

    let user = state
        .users
        .create_user(CreateUserInput {
            email: request.email,
            name: request.name,
            password: request.password,
            role: Some(UserRole::User),
            status: Some(UserStatus::Active),
        })
        .await?;

    Ok(ApiResponse::created(TokenResponse::issue(user)?))
}

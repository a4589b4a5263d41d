// handlers/protected/mod.rs - endpoints behind JWT auth
//
// Route Prefix: /api/*
// Middleware: jwt_auth_middleware, then validate_user_middleware, so every
// handler here sees an `AuthUser` for an active account with its stored role.

pub mod auth;
pub mod channels;
pub mod notifications;
pub mod users;

use uuid::Uuid;

use crate::error::ApiError;
use crate::services::parse_id;

/// Parse a path id, reporting a 400 that names the entity
pub(crate) fn path_id(raw: &str, entity: &str) -> Result<Uuid, ApiError> {
    Ok(parse_id(raw, entity)?)
}

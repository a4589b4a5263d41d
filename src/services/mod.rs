pub mod channel_service;
pub mod notification_service;
pub mod user_service;

use std::collections::HashMap;

use thiserror::Error;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

pub use channel_service::ChannelService;
pub use notification_service::{AccountNotifier, NotificationService};
pub use user_service::{DefaultUserValidator, UserNotifier, UserValidator, UsersService};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: HashMap<String, String>,
    },

    #[error("{0}")]
    InvalidId(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Password hashing failed")]
    PasswordHash(#[from] bcrypt::BcryptError),

    #[error("Database error occurred")]
    Database(#[source] DatabaseError),
}

impl ServiceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut field_errors = HashMap::new();
        field_errors.insert(field.to_string(), message.clone());
        ServiceError::Validation { message, field_errors }
    }

    /// Collapse per-field errors into one error; `None` when there are none
    pub fn from_field_errors(field_errors: HashMap<String, String>) -> Option<Self> {
        if field_errors.is_empty() {
            return None;
        }
        let message = if field_errors.len() == 1 {
            field_errors.values().next().cloned().unwrap_or_default()
        } else {
            "Validation failed".to_string()
        };
        Some(ServiceError::Validation { message, field_errors })
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => ServiceError::NotFound(msg),
            DatabaseError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Database(other),
        }
    }
}

/// Parse a path or body identifier, naming the entity in the error
pub fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ServiceError::InvalidId(format!("Invalid {} id '{}'", entity, raw)))
}

/// 1-based page number and page size, clamped to sane bounds
pub fn clamp_page(page: Option<i64>, limit: Option<i64>, default_limit: i64, max_limit: i64) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(default_limit).clamp(1, max_limit);
    (page, limit)
}

/// Row offset of a clamped page; a page too far out to address is rejected
pub fn page_offset(page: i64, limit: i64) -> Result<i64, ServiceError> {
    page.saturating_sub(1)
        .max(0)
        .checked_mul(limit)
        .ok_or_else(|| ServiceError::validation("page", "Page is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_errors_map_to_service_errors() {
        let err: ServiceError = DatabaseError::NotFound("User not found".to_string()).into();
        assert!(matches!(err, ServiceError::NotFound(ref m) if m == "User not found"));

        let err: ServiceError = DatabaseError::QueryError("boom".to_string()).into();
        assert!(matches!(err, ServiceError::Database(_)));
    }

    #[test]
    fn storage_failures_render_without_driver_text() {
        let err: ServiceError = DatabaseError::QueryError("relation \"users\" does not exist".to_string()).into();
        assert_eq!(err.to_string(), "Database error occurred");
        let source = std::error::Error::source(&err).map(|e| e.to_string()).unwrap_or_default();
        assert!(source.contains("relation"));
    }

    #[test]
    fn huge_page_numbers_are_rejected_not_overflowed() {
        assert_eq!(page_offset(1, 20).unwrap(), 0);
        assert_eq!(page_offset(3, 20).unwrap(), 40);

        let (page, limit) = clamp_page(Some(i64::MAX), Some(100), 20, 100);
        let err = page_offset(page, limit).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field_errors, .. } if field_errors.contains_key("page")));
    }

    #[test]
    fn invalid_id_names_the_input() {
        let err = parse_id("user-2", "user").unwrap_err();
        assert_eq!(err.to_string(), "Invalid user id 'user-2'");
    }

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(clamp_page(None, None, 20, 100), (1, 20));
        assert_eq!(clamp_page(Some(0), Some(1000), 20, 100), (1, 100));
        assert_eq!(clamp_page(Some(3), Some(-5), 20, 100), (3, 1));
    }
}

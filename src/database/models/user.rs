use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::types::{UserRole, UserStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when inserting a user; id and timestamps come from storage
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
}

/// Partial update; `None` leaves the column untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

impl UserPatch {
    pub fn status(status: UserStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn role(role: UserRole) -> Self {
        Self {
            role: Some(role),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply onto an in-memory user, bumping `updated_at`
    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(hash) = self.password_hash {
            user.password_hash = hash;
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
        user.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    /// Case-insensitive substring match on email or name
    pub search: Option<String>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        if self.role.is_some_and(|role| role != user.role) {
            return false;
        }
        if self.status.is_some_and(|status| status != user.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                user.email.to_lowercase().contains(&term) || user.name.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Row shape in Postgres; enums are stored as text
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DatabaseError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            role: row.role.parse().map_err(|e| DatabaseError::QueryError(format!("{}", e)))?,
            status: row.status.parse().map_err(|e| DatabaseError::QueryError(format!("{}", e)))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "ada@example.com".to_string(),
            name: "Ada Lovelace".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role: UserRole::User,
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["status"], "active");
    }

    #[test]
    fn patch_touches_only_given_fields() {
        let mut user = sample();
        let before = user.clone();
        UserPatch::role(UserRole::Admin).apply(&mut user);

        assert_eq!(user.role, UserRole::Admin);
        assert_eq!(user.email, before.email);
        assert_eq!(user.status, before.status);
        assert!(user.updated_at >= before.updated_at);
    }

    #[test]
    fn filter_matches_search_and_enums() {
        let user = sample();
        let filter = UserFilter {
            search: Some("LOVE".to_string()),
            status: Some(UserStatus::Active),
            ..Default::default()
        };
        assert!(filter.matches(&user));

        let filter = UserFilter {
            role: Some(UserRole::Admin),
            ..Default::default()
        };
        assert!(!filter.matches(&user));
    }

    #[test]
    fn corrupt_row_is_rejected() {
        let now = Utc::now();
        let row = UserRow {
            id: Uuid::new_v4(),
            email: "x@example.com".to_string(),
            name: "X".to_string(),
            password_hash: String::new(),
            role: "superuser".to_string(),
            status: "active".to_string(),
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(User::try_from(row), Err(DatabaseError::QueryError(_))));
    }
}

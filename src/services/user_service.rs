use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth;
use crate::bulk::{run_bulk, BulkOperationResult};
use crate::config;
use crate::database::models::{NewUser, User, UserFilter, UserPatch};
use crate::database::repository::{Pagination, UserRepository};
use crate::services::{clamp_page, page_offset, parse_id, ServiceError};
use crate::types::{UserRole, UserStatus};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub items: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total: i64,
    pub by_status: BTreeMap<UserStatus, i64>,
    pub by_role: BTreeMap<UserRole, i64>,
}

/// Input checks applied before anything reaches storage
pub trait UserValidator: Send + Sync {
    fn validate_create(&self, input: &CreateUserInput) -> Result<(), ServiceError>;
    fn validate_update(&self, input: &UpdateUserInput) -> Result<(), ServiceError>;
}

/// Side effects after account changes. Implementations swallow their own
/// failures; a failed email never fails the user operation.
#[async_trait]
pub trait UserNotifier: Send + Sync {
    async fn user_created(&self, user: &User);
    async fn status_changed(&self, user: &User);
    async fn role_changed(&self, user: &User);
}

#[derive(Debug, Default, Clone)]
pub struct DefaultUserValidator;

impl DefaultUserValidator {
    fn check_email(email: &str, errors: &mut HashMap<String, String>) {
        let email = email.trim();
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.contains(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            errors.insert("email".to_string(), "Email must be a valid address".to_string());
        }
    }

    fn check_name(name: &str, errors: &mut HashMap<String, String>) {
        let len = name.trim().chars().count();
        if len == 0 || len > 100 {
            errors.insert("name".to_string(), "Name must be between 1 and 100 characters".to_string());
        }
    }

    fn check_password(password: &str, errors: &mut HashMap<String, String>) {
        if password.chars().count() < 8 {
            errors.insert("password".to_string(), "Password must be at least 8 characters".to_string());
        }
    }
}

impl UserValidator for DefaultUserValidator {
    fn validate_create(&self, input: &CreateUserInput) -> Result<(), ServiceError> {
        let mut errors = HashMap::new();
        Self::check_email(&input.email, &mut errors);
        Self::check_name(&input.name, &mut errors);
        Self::check_password(&input.password, &mut errors);
        ServiceError::from_field_errors(errors).map_or(Ok(()), Err)
    }

    fn validate_update(&self, input: &UpdateUserInput) -> Result<(), ServiceError> {
        let mut errors = HashMap::new();
        if let Some(email) = &input.email {
            Self::check_email(email, &mut errors);
        }
        if let Some(name) = &input.name {
            Self::check_name(name, &mut errors);
        }
        if let Some(password) = &input.password {
            Self::check_password(password, &mut errors);
        }
        ServiceError::from_field_errors(errors).map_or(Ok(()), Err)
    }
}

/// Emails are stored trimmed and lowercase; lookups use the same form
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User management over injected storage, validation and notification
pub struct UsersService {
    repo: Arc<dyn UserRepository>,
    validator: Arc<dyn UserValidator>,
    notifier: Arc<dyn UserNotifier>,
    bulk_max_ids: usize,
}

impl UsersService {
    pub fn new(
        repo: Arc<dyn UserRepository>,
        validator: Arc<dyn UserValidator>,
        notifier: Arc<dyn UserNotifier>,
    ) -> Self {
        Self {
            repo,
            validator,
            notifier,
            bulk_max_ids: config::config().api.bulk_max_ids,
        }
    }

    pub fn with_bulk_limit(mut self, bulk_max_ids: usize) -> Self {
        self.bulk_max_ids = bulk_max_ids;
        self
    }

    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, ServiceError> {
        self.validator.validate_create(&input)?;

        let email = normalize_email(&input.email);
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict(format!("Email {} is already registered", email)));
        }

        let user = self
            .repo
            .insert(NewUser {
                email,
                name: input.name.trim().to_string(),
                password_hash: auth::hash_password(&input.password)?,
                role: input.role.unwrap_or(UserRole::User),
                status: input.status.unwrap_or(UserStatus::Active),
            })
            .await?;

        info!("Created user {} ({})", user.id, user.role);
        self.notifier.user_created(&user).await;
        Ok(user)
    }

    pub async fn find_all(&self, query: ListUsersQuery) -> Result<UserPage, ServiceError> {
        let (page, limit) = clamp_page(query.page, query.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
        let offset = page_offset(page, limit)?;
        let filter = UserFilter {
            role: query.role,
            status: query.status,
            search: query.search,
        };

        let items = self
            .repo
            .list(&filter, Pagination { offset, limit })
            .await?;
        let total = self.repo.count(&filter).await?;

        Ok(UserPage { items, total, page, limit })
    }

    pub async fn find_one(&self, id: &str) -> Result<User, ServiceError> {
        let id = parse_id(id, "user")?;
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.repo.find_by_email(&normalize_email(email)).await?)
    }

    pub async fn update_user(&self, id: &str, input: UpdateUserInput) -> Result<User, ServiceError> {
        self.validator.validate_update(&input)?;

        let patch = UserPatch {
            email: input.email.as_deref().map(normalize_email),
            name: input.name.map(|n| n.trim().to_string()),
            password_hash: input.password.as_deref().map(auth::hash_password).transpose()?,
            ..Default::default()
        };
        if patch.is_empty() {
            return self.find_one(id).await;
        }
        self.apply_patch(id, patch).await
    }

    pub async fn update_status(&self, id: &str, status: UserStatus) -> Result<User, ServiceError> {
        let user = self.apply_patch(id, UserPatch::status(status)).await?;
        info!("User {} status set to {}", user.id, status);
        self.notifier.status_changed(&user).await;
        Ok(user)
    }

    pub async fn update_role(&self, id: &str, role: UserRole) -> Result<User, ServiceError> {
        let user = self.apply_patch(id, UserPatch::role(role)).await?;
        info!("User {} role set to {}", user.id, role);
        self.notifier.role_changed(&user).await;
        Ok(user)
    }

    pub async fn remove_user(&self, id: &str) -> Result<(), ServiceError> {
        let id = parse_id(id, "user")?;
        self.repo.delete(id).await?;
        info!("Deleted user {}", id);
        Ok(())
    }

    /// Set the status of every listed user; failures are reported per item.
    /// No notifications are sent for bulk changes.
    pub async fn bulk_update_status(
        &self,
        ids: &[String],
        status: UserStatus,
    ) -> Result<BulkOperationResult<User>, ServiceError> {
        self.check_bulk_size(ids)?;
        info!("Bulk status update to {} for {} users", status, ids.len());
        Ok(run_bulk(ids, |id| async move { self.bulk_item(&id, UserPatch::status(status)).await }).await)
    }

    /// Set the role of every listed user; failures are reported per item.
    pub async fn bulk_update_role(
        &self,
        ids: &[String],
        role: UserRole,
    ) -> Result<BulkOperationResult<User>, ServiceError> {
        self.check_bulk_size(ids)?;
        info!("Bulk role update to {} for {} users", role, ids.len());
        Ok(run_bulk(ids, |id| async move { self.bulk_item(&id, UserPatch::role(role)).await }).await)
    }

    pub async fn stats(&self) -> Result<UserStats, ServiceError> {
        let total = self.repo.count(&UserFilter::default()).await?;

        let mut by_status = BTreeMap::new();
        for status in UserStatus::ALL {
            let filter = UserFilter {
                status: Some(status),
                ..Default::default()
            };
            by_status.insert(status, self.repo.count(&filter).await?);
        }

        let mut by_role = BTreeMap::new();
        for role in UserRole::ALL {
            let filter = UserFilter {
                role: Some(role),
                ..Default::default()
            };
            by_role.insert(role, self.repo.count(&filter).await?);
        }

        Ok(UserStats { total, by_status, by_role })
    }

    /// Check credentials; only active accounts may sign in
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

        let user = self.repo.find_by_email(&normalize_email(email)).await?.ok_or_else(invalid)?;
        if !auth::verify_password(password, &user.password_hash) {
            return Err(invalid());
        }
        if user.status != UserStatus::Active {
            return Err(ServiceError::Forbidden(format!("Account is {}", user.status)));
        }
        Ok(user)
    }

    /// Create the configured admin account unless the email already exists
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        if let Some(existing) = self.repo.find_by_email(&normalize_email(email)).await? {
            return Ok(existing);
        }
        let input = CreateUserInput {
            email: email.to_string(),
            name: "Administrator".to_string(),
            password: password.to_string(),
            role: Some(UserRole::Admin),
            status: Some(UserStatus::Active),
        };
        self.validator.validate_create(&input)?;

        let user = self
            .repo
            .insert(NewUser {
                email: normalize_email(&input.email),
                name: input.name,
                password_hash: auth::hash_password(&input.password)?,
                role: UserRole::Admin,
                status: UserStatus::Active,
            })
            .await?;
        info!("Bootstrapped admin account {}", user.email);
        Ok(user)
    }

    /// Storage liveness, surfaced by `/health`
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(self.repo.ping().await?)
    }

    async fn apply_patch(&self, id: &str, patch: UserPatch) -> Result<User, ServiceError> {
        let id = parse_id(id, "user")?;
        Ok(self.repo.update(id, patch).await?)
    }

    /// One bulk step. Storage failures are reported to the caller by their
    /// generic message only, so the detail is logged here.
    async fn bulk_item(&self, id: &str, patch: UserPatch) -> Result<User, ServiceError> {
        self.apply_patch(id, patch).await.map_err(|err| {
            if let ServiceError::Database(db) = &err {
                tracing::error!("Bulk update of user {} failed in storage: {}", id, db);
            }
            err
        })
    }

    fn check_bulk_size(&self, ids: &[String]) -> Result<(), ServiceError> {
        if ids.len() > self.bulk_max_ids {
            return Err(ServiceError::validation(
                "ids",
                format!("At most {} ids may be updated at once", self.bulk_max_ids),
            ));
        }
        Ok(())
    }
}

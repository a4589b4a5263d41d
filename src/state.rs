use std::sync::Arc;

use tracing::info;

use crate::config::{AppConfig, StorageBackend};
use crate::database::memory::{MemoryChannelRepository, MemoryNotificationRepository, MemoryUserRepository};
use crate::database::postgres::{PgChannelRepository, PgNotificationRepository, PgUserRepository};
use crate::database::{ChannelRepository, DatabaseError, DatabaseManager, NotificationRepository, UserRepository};
use crate::email::{self, EmailSender};
use crate::services::{AccountNotifier, ChannelService, DefaultUserValidator, NotificationService, UsersService};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<UsersService>,
    pub notifications: Arc<NotificationService>,
    pub channels: Arc<ChannelService>,
}

impl AppState {
    /// Wire services over the given capabilities
    pub fn new(
        users: Arc<dyn UserRepository>,
        notifications: Arc<dyn NotificationRepository>,
        channels: Arc<dyn ChannelRepository>,
        email: Arc<dyn EmailSender>,
    ) -> Self {
        let notifications = Arc::new(NotificationService::new(notifications, email));
        let notifier = Arc::new(AccountNotifier::new(notifications.clone()));
        let users = Arc::new(UsersService::new(users, Arc::new(DefaultUserValidator), notifier));

        Self {
            users,
            notifications,
            channels: Arc::new(ChannelService::new(channels)),
        }
    }

    /// Memory storage with logged email
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryUserRepository::new()),
            Arc::new(MemoryNotificationRepository::new()),
            Arc::new(MemoryChannelRepository::new()),
            Arc::new(email::LogEmailSender),
        )
    }

    /// Build from configuration, connecting to Postgres when selected
    pub async fn from_config(config: &AppConfig) -> Result<Self, DatabaseError> {
        let email = email::sender_from_config(&config.email);

        let state = match config.storage.backend {
            StorageBackend::Memory => {
                info!("Using in-memory storage; data is lost on restart");
                Self::new(
                    Arc::new(MemoryUserRepository::new()),
                    Arc::new(MemoryNotificationRepository::new()),
                    Arc::new(MemoryChannelRepository::new()),
                    email,
                )
            }
            StorageBackend::Postgres => {
                let pool = DatabaseManager::pool().await?;
                DatabaseManager::ensure_schema(&pool).await?;
                Self::new(
                    Arc::new(PgUserRepository::new(pool.clone())),
                    Arc::new(PgNotificationRepository::new(pool.clone())),
                    Arc::new(PgChannelRepository::new(pool)),
                    email,
                )
            }
        };

        if let (Some(admin_email), Some(admin_password)) =
            (&config.security.admin_email, &config.security.admin_password)
        {
            if let Err(e) = state.users.ensure_admin(admin_email, admin_password).await {
                tracing::error!("Could not bootstrap admin {}: {}", admin_email, e);
            }
        }

        Ok(state)
    }
}

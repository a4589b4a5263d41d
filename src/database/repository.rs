use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::channel::{Channel, Message, NewChannel, NewMessage};
use crate::database::models::notification::{NewNotification, Notification};
use crate::database::models::user::{NewUser, User, UserFilter, UserPatch};

/// Offset pagination shared by list queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub offset: i64,
    pub limit: i64,
}

/// Persistence capability for users
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with Conflict when the email is taken
    async fn insert(&self, user: NewUser) -> Result<User, DatabaseError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError>;

    /// Email lookup is case-insensitive
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError>;

    /// Ordered by creation time, oldest first
    async fn list(&self, filter: &UserFilter, page: Pagination) -> Result<Vec<User>, DatabaseError>;

    async fn count(&self, filter: &UserFilter) -> Result<i64, DatabaseError>;

    /// Fails with NotFound for unknown ids and Conflict for a taken email
    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError>;

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError>;

    async fn ping(&self) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: NewNotification) -> Result<Notification, DatabaseError>;

    /// Newest first
    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: Pagination,
    ) -> Result<Vec<Notification>, DatabaseError>;

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, DatabaseError>;

    /// NotFound unless the notification exists and belongs to `user_id`
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, DatabaseError>;

    /// Returns how many notifications changed
    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, DatabaseError>;

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), DatabaseError>;
}

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    /// Fails with Conflict when the name is taken
    async fn insert_channel(&self, channel: NewChannel) -> Result<Channel, DatabaseError>;

    async fn find_channel(&self, id: Uuid) -> Result<Option<Channel>, DatabaseError>;

    /// Removes the channel with its members and messages; false when absent
    async fn delete_channel(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Ordered by name
    async fn list_channels(&self) -> Result<Vec<Channel>, DatabaseError>;

    /// Returns false when the user was already a member
    async fn add_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError>;

    /// Returns false when the user was not a member
    async fn remove_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError>;

    async fn is_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError>;

    /// Ordered by join time
    async fn members(&self, channel_id: Uuid) -> Result<Vec<Uuid>, DatabaseError>;

    async fn insert_message(&self, message: NewMessage) -> Result<Message, DatabaseError>;

    /// The latest `limit` messages strictly before `before` (or overall),
    /// returned oldest first
    async fn list_messages(
        &self,
        channel_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, DatabaseError>;
}

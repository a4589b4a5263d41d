use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::channel::{Channel, Message, NewChannel, NewMessage};
use crate::database::models::notification::{NewNotification, Notification, NotificationRow};
use crate::database::models::user::{NewUser, User, UserFilter, UserPatch, UserRow};
use crate::database::repository::{ChannelRepository, NotificationRepository, Pagination, UserRepository};

const USER_COLUMNS: &str = "id, email, name, password_hash, role, status, created_at, updated_at";
const NOTIFICATION_COLUMNS: &str = "id, user_id, kind, title, message, read, created_at";

/// `$1` role, `$2` status, `$3` search pattern; NULL disables a condition
const USER_FILTER_SQL: &str = "($1::text IS NULL OR role = $1) \
     AND ($2::text IS NULL OR status = $2) \
     AND ($3::text IS NULL OR email ILIKE $3 OR name ILIKE $3)";

fn search_pattern(filter: &UserFilter) -> Option<String> {
    filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{}%", term.replace('%', "\\%").replace('_', "\\_")))
}

#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: NewUser) -> Result<User, DatabaseError> {
        let sql = format!(
            "INSERT INTO users (id, email, name, password_hash, role, status) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            USER_COLUMNS
        );
        let conflict = format!("Email {} is already registered", user.email);

        let row: UserRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, &conflict))?;
        row.try_into()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let sql = format!("SELECT {} FROM users WHERE lower(email) = lower($1)", USER_COLUMNS);
        let row: Option<UserRow> = sqlx::query_as(&sql).bind(email).fetch_optional(&self.pool).await?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self, filter: &UserFilter, page: Pagination) -> Result<Vec<User>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} ORDER BY created_at, id LIMIT $4 OFFSET $5",
            USER_COLUMNS, USER_FILTER_SQL
        );
        let rows: Vec<UserRow> = sqlx::query_as(&sql)
            .bind(filter.role.map(|r| r.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(search_pattern(filter))
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn count(&self, filter: &UserFilter) -> Result<i64, DatabaseError> {
        let sql = format!("SELECT COUNT(*) FROM users WHERE {}", USER_FILTER_SQL);
        let count: (i64,) = sqlx::query_as(&sql)
            .bind(filter.role.map(|r| r.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(search_pattern(filter))
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError> {
        let sql = format!(
            "UPDATE users SET \
                email = COALESCE($2, email), \
                name = COALESCE($3, name), \
                password_hash = COALESCE($4, password_hash), \
                role = COALESCE($5, role), \
                status = COALESCE($6, status), \
                updated_at = now() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        let conflict = format!(
            "Email {} is already registered",
            patch.email.as_deref().unwrap_or_default()
        );

        let row: Option<UserRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(patch.email.as_deref())
            .bind(patch.name.as_deref())
            .bind(patch.password_hash.as_deref())
            .bind(patch.role.map(|r| r.as_str()))
            .bind(patch.status.map(|s| s.as_str()))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DatabaseError::from_write(e, &conflict))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(DatabaseError::NotFound("User not found".to_string())),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        DatabaseManager::health_check(&self.pool).await
    }
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn insert(&self, notification: NewNotification) -> Result<Notification, DatabaseError> {
        let sql = format!(
            "INSERT INTO notifications (id, user_id, kind, title, message) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let row: NotificationRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(notification.user_id)
            .bind(notification.kind.as_str())
            .bind(&notification.title)
            .bind(&notification.message)
            .fetch_one(&self.pool)
            .await?;
        row.try_into()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: Pagination,
    ) -> Result<Vec<Notification>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM notifications \
             WHERE user_id = $1 AND (NOT $2 OR read = false) \
             ORDER BY created_at DESC, id DESC LIMIT $3 OFFSET $4",
            NOTIFICATION_COLUMNS
        );
        let rows: Vec<NotificationRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .bind(unread_only)
            .bind(page.limit)
            .bind(page.offset)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND read = false")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, DatabaseError> {
        let sql = format!(
            "UPDATE notifications SET read = true WHERE id = $1 AND user_id = $2 RETURNING {}",
            NOTIFICATION_COLUMNS
        );
        let row: Option<NotificationRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => row.try_into(),
            None => Err(DatabaseError::NotFound("Notification not found".to_string())),
        }
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE notifications SET read = true WHERE user_id = $1 AND read = false")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgChannelRepository {
    pool: PgPool,
}

impl PgChannelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ChannelRepository for PgChannelRepository {
    async fn insert_channel(&self, channel: NewChannel) -> Result<Channel, DatabaseError> {
        let conflict = format!("Channel '{}' already exists", channel.name);
        sqlx::query_as(
            "INSERT INTO channels (id, name, description, created_by) VALUES ($1, $2, $3, $4) \
             RETURNING id, name, description, created_by, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&channel.name)
        .bind(channel.description.as_deref())
        .bind(channel.created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DatabaseError::from_write(e, &conflict))
    }

    async fn find_channel(&self, id: Uuid) -> Result<Option<Channel>, DatabaseError> {
        Ok(sqlx::query_as(
            "SELECT id, name, description, created_by, created_at FROM channels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_channel(&self, id: Uuid) -> Result<bool, DatabaseError> {
        // Members and messages go with it via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_channels(&self) -> Result<Vec<Channel>, DatabaseError> {
        Ok(sqlx::query_as(
            "SELECT id, name, description, created_by, created_at FROM channels ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn add_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "INSERT INTO channel_members (channel_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(channel_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM channel_members WHERE channel_id = $1 AND user_id = $2")
            .bind(channel_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM channel_members WHERE channel_id = $1 AND user_id = $2)",
        )
        .bind(channel_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.0)
    }

    async fn members(&self, channel_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT user_id FROM channel_members WHERE channel_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message, DatabaseError> {
        Ok(sqlx::query_as(
            "INSERT INTO messages (id, channel_id, author_id, body) VALUES ($1, $2, $3, $4) \
             RETURNING id, channel_id, author_id, body, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(message.channel_id)
        .bind(message.author_id)
        .bind(&message.body)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_messages(
        &self,
        channel_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, DatabaseError> {
        // Take the newest page, then flip it back to chronological order
        let mut messages: Vec<Message> = sqlx::query_as(
            "SELECT id, channel_id, author_id, body, created_at FROM messages \
             WHERE channel_id = $1 AND ($2::timestamptz IS NULL OR created_at < $2) \
             ORDER BY created_at DESC, id DESC LIMIT $3",
        )
        .bind(channel_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }
}

//! In-process storage used when no database is configured, and by tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::models::channel::{Channel, Message, NewChannel, NewMessage};
use crate::database::models::notification::{NewNotification, Notification};
use crate::database::models::user::{NewUser, User, UserFilter, UserPatch};
use crate::database::repository::{ChannelRepository, NotificationRepository, Pagination, UserRepository};

fn window<T>(items: Vec<T>, page: Pagination) -> Vec<T> {
    items
        .into_iter()
        .skip(page.offset.max(0) as usize)
        .take(page.limit.max(0) as usize)
        .collect()
}

/// Users kept in insertion order, which is also creation order
#[derive(Clone, Default)]
pub struct MemoryUserRepository {
    users: Arc<RwLock<Vec<User>>>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(users: &[User], email: &str, except: Option<Uuid>) -> bool {
        users
            .iter()
            .any(|u| Some(u.id) != except && u.email.eq_ignore_ascii_case(email))
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn insert(&self, new_user: NewUser) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        if Self::email_taken(&users, &new_user.email, None) {
            return Err(DatabaseError::Conflict(format!("Email {} is already registered", new_user.email)));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: new_user.email,
            name: new_user.name,
            password_hash: new_user.password_hash,
            role: new_user.role,
            status: new_user.status,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DatabaseError> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn list(&self, filter: &UserFilter, page: Pagination) -> Result<Vec<User>, DatabaseError> {
        let users = self.users.read().await;
        let matching: Vec<User> = users.iter().filter(|u| filter.matches(u)).cloned().collect();
        Ok(window(matching, page))
    }

    async fn count(&self, filter: &UserFilter) -> Result<i64, DatabaseError> {
        let users = self.users.read().await;
        Ok(users.iter().filter(|u| filter.matches(u)).count() as i64)
    }

    async fn update(&self, id: Uuid, patch: UserPatch) -> Result<User, DatabaseError> {
        let mut users = self.users.write().await;
        if let Some(email) = patch.email.as_deref() {
            if Self::email_taken(&users, email, Some(id)) {
                return Err(DatabaseError::Conflict(format!("Email {} is already registered", email)));
            }
        }

        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| DatabaseError::NotFound("User not found".to_string()))?;
        patch.apply(user);
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|u| u.id != id);
        if users.len() == before {
            return Err(DatabaseError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryNotificationRepository {
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationRepository for MemoryNotificationRepository {
    async fn insert(&self, new: NewNotification) -> Result<Notification, DatabaseError> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            read: false,
            created_at: Utc::now(),
        };
        self.notifications.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        page: Pagination,
    ) -> Result<Vec<Notification>, DatabaseError> {
        let notifications = self.notifications.read().await;
        // Stored in insertion order, so reversing yields newest first
        let matching: Vec<Notification> = notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        Ok(window(matching, page))
    }

    async fn count_unread(&self, user_id: Uuid) -> Result<i64, DatabaseError> {
        let notifications = self.notifications.read().await;
        Ok(notifications.iter().filter(|n| n.user_id == user_id && !n.read).count() as i64)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, DatabaseError> {
        let mut notifications = self.notifications.write().await;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| DatabaseError::NotFound("Notification not found".to_string()))?;
        notification.read = true;
        Ok(notification.clone())
    }

    async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let mut notifications = self.notifications.write().await;
        let mut changed = 0;
        for n in notifications.iter_mut().filter(|n| n.user_id == user_id && !n.read) {
            n.read = true;
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), DatabaseError> {
        let mut notifications = self.notifications.write().await;
        let before = notifications.len();
        notifications.retain(|n| !(n.id == id && n.user_id == user_id));
        if notifications.len() == before {
            return Err(DatabaseError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
struct ChannelState {
    channels: HashMap<Uuid, Channel>,
    members: HashMap<Uuid, Vec<Uuid>>,
    messages: HashMap<Uuid, Vec<Message>>,
}

#[derive(Clone, Default)]
pub struct MemoryChannelRepository {
    state: Arc<RwLock<ChannelState>>,
}

impl MemoryChannelRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChannelRepository for MemoryChannelRepository {
    async fn insert_channel(&self, new: NewChannel) -> Result<Channel, DatabaseError> {
        let mut state = self.state.write().await;
        if state.channels.values().any(|c| c.name == new.name) {
            return Err(DatabaseError::Conflict(format!("Channel '{}' already exists", new.name)));
        }

        let channel = Channel {
            id: Uuid::new_v4(),
            name: new.name,
            description: new.description,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        state.channels.insert(channel.id, channel.clone());
        Ok(channel)
    }

    async fn find_channel(&self, id: Uuid) -> Result<Option<Channel>, DatabaseError> {
        Ok(self.state.read().await.channels.get(&id).cloned())
    }

    async fn delete_channel(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        state.members.remove(&id);
        state.messages.remove(&id);
        Ok(state.channels.remove(&id).is_some())
    }

    async fn list_channels(&self) -> Result<Vec<Channel>, DatabaseError> {
        let state = self.state.read().await;
        let mut channels: Vec<Channel> = state.channels.values().cloned().collect();
        channels.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(channels)
    }

    async fn add_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        let members = state.members.entry(channel_id).or_default();
        if members.contains(&user_id) {
            return Ok(false);
        }
        members.push(user_id);
        Ok(true)
    }

    async fn remove_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let mut state = self.state.write().await;
        let Some(members) = state.members.get_mut(&channel_id) else {
            return Ok(false);
        };
        let before = members.len();
        members.retain(|m| *m != user_id);
        Ok(members.len() != before)
    }

    async fn is_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, DatabaseError> {
        let state = self.state.read().await;
        Ok(state
            .members
            .get(&channel_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn members(&self, channel_id: Uuid) -> Result<Vec<Uuid>, DatabaseError> {
        Ok(self.state.read().await.members.get(&channel_id).cloned().unwrap_or_default())
    }

    async fn insert_message(&self, new: NewMessage) -> Result<Message, DatabaseError> {
        let message = Message {
            id: Uuid::new_v4(),
            channel_id: new.channel_id,
            author_id: new.author_id,
            body: new.body,
            created_at: Utc::now(),
        };
        self.state
            .write()
            .await
            .messages
            .entry(message.channel_id)
            .or_default()
            .push(message.clone());
        Ok(message)
    }

    async fn list_messages(
        &self,
        channel_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>, DatabaseError> {
        let state = self.state.read().await;
        let Some(messages) = state.messages.get(&channel_id) else {
            return Ok(Vec::new());
        };

        let eligible: Vec<&Message> = messages
            .iter()
            .filter(|m| before.map_or(true, |cursor| m.created_at < cursor))
            .collect();
        let skip = eligible.len().saturating_sub(limit.max(0) as usize);
        Ok(eligible.into_iter().skip(skip).cloned().collect())
    }
}

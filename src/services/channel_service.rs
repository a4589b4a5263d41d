use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use crate::database::models::{Channel, Message, NewChannel, NewMessage};
use crate::database::repository::ChannelRepository;
use crate::services::ServiceError;

const MAX_BODY_CHARS: usize = 4000;
const DEFAULT_PAGE: i64 = 50;
const MAX_PAGE: i64 = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateChannelInput {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMessagesQuery {
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

/// Chat channels: membership gates posting and reading
pub struct ChannelService {
    repo: Arc<dyn ChannelRepository>,
}

impl ChannelService {
    pub fn new(repo: Arc<dyn ChannelRepository>) -> Self {
        Self { repo }
    }

    /// Names are 2-50 chars of lowercase letters, digits, `-` and `_`
    fn validate_name(name: &str) -> Result<(), ServiceError> {
        let len = name.chars().count();
        let allowed = name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !(2..=50).contains(&len) || !allowed {
            return Err(ServiceError::validation(
                "name",
                "Channel name must be 2-50 characters of a-z, 0-9, '-' or '_'",
            ));
        }
        Ok(())
    }

    pub async fn create_channel(&self, creator: Uuid, input: CreateChannelInput) -> Result<Channel, ServiceError> {
        let name = input.name.trim().to_lowercase();
        Self::validate_name(&name)?;

        let description = input
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let channel = self
            .repo
            .insert_channel(NewChannel {
                name,
                description,
                created_by: creator,
            })
            .await?;
        // A channel must never exist without its creator as a member
        if let Err(e) = self.repo.add_member(channel.id, creator).await {
            if let Err(cleanup) = self.repo.delete_channel(channel.id).await {
                error!("Channel #{} left without members: {}", channel.name, cleanup);
            }
            return Err(e.into());
        }

        info!("Channel #{} created by {}", channel.name, creator);
        Ok(channel)
    }

    pub async fn list_channels(&self) -> Result<Vec<Channel>, ServiceError> {
        Ok(self.repo.list_channels().await?)
    }

    pub async fn get_channel(&self, id: Uuid) -> Result<Channel, ServiceError> {
        self.repo
            .find_channel(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Channel not found".to_string()))
    }

    /// Returns false when the user was already a member
    pub async fn join(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        self.get_channel(channel_id).await?;
        Ok(self.repo.add_member(channel_id, user_id).await?)
    }

    pub async fn leave(&self, channel_id: Uuid, user_id: Uuid) -> Result<bool, ServiceError> {
        self.get_channel(channel_id).await?;
        Ok(self.repo.remove_member(channel_id, user_id).await?)
    }

    pub async fn members(&self, channel_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        self.get_channel(channel_id).await?;
        Ok(self.repo.members(channel_id).await?)
    }

    pub async fn post_message(&self, channel_id: Uuid, author: Uuid, body: &str) -> Result<Message, ServiceError> {
        self.require_member(channel_id, author).await?;

        let body = body.trim();
        if body.is_empty() || body.chars().count() > MAX_BODY_CHARS {
            return Err(ServiceError::validation(
                "body",
                format!("Message must be between 1 and {} characters", MAX_BODY_CHARS),
            ));
        }

        Ok(self
            .repo
            .insert_message(NewMessage {
                channel_id,
                author_id: author,
                body: body.to_string(),
            })
            .await?)
    }

    /// Oldest first; `before` pages backwards through history
    pub async fn list_messages(
        &self,
        channel_id: Uuid,
        reader: Uuid,
        query: ListMessagesQuery,
    ) -> Result<Vec<Message>, ServiceError> {
        self.require_member(channel_id, reader).await?;
        let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
        Ok(self.repo.list_messages(channel_id, query.before, limit).await?)
    }

    async fn require_member(&self, channel_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        self.get_channel(channel_id).await?;
        if !self.repo.is_member(channel_id, user_id).await? {
            return Err(ServiceError::Forbidden("You are not a member of this channel".to_string()));
        }
        Ok(())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::models::{NewNotification, Notification, User};
use crate::database::repository::{NotificationRepository, Pagination};
use crate::email::{EmailMessage, EmailSender, EmailTemplate};
use crate::services::user_service::UserNotifier;
use crate::services::{clamp_page, page_offset, ServiceError};
use crate::types::NotificationKind;

const MAX_TITLE_CHARS: usize = 200;
const MAX_MESSAGE_CHARS: usize = 2000;

#[derive(Debug, Clone, Deserialize)]
pub struct NotifyInput {
    pub user_id: Uuid,
    #[serde(default = "default_kind")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

fn default_kind() -> NotificationKind {
    NotificationKind::Info
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListNotificationsQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// In-app notifications with optional email delivery
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    email: Arc<dyn EmailSender>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, email: Arc<dyn EmailSender>) -> Self {
        Self { repo, email }
    }

    /// Store a notification; when `email_to` is given, also send it by email.
    /// Email failures are logged and do not fail the call.
    pub async fn notify(&self, input: NotifyInput, email_to: Option<&str>) -> Result<Notification, ServiceError> {
        let title = input.title.trim();
        let message = input.message.trim();
        if title.is_empty() || title.chars().count() > MAX_TITLE_CHARS {
            return Err(ServiceError::validation(
                "title",
                format!("Title must be between 1 and {} characters", MAX_TITLE_CHARS),
            ));
        }
        if message.is_empty() || message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ServiceError::validation(
                "message",
                format!("Message must be between 1 and {} characters", MAX_MESSAGE_CHARS),
            ));
        }

        let notification = self
            .repo
            .insert(NewNotification {
                user_id: input.user_id,
                kind: input.kind,
                title: title.to_string(),
                message: message.to_string(),
            })
            .await?;

        if let Some(to) = email_to {
            let template = EmailTemplate::Notification {
                title: notification.title.clone(),
                message: notification.message.clone(),
            };
            self.send_email(to, &template).await;
        }

        Ok(notification)
    }

    /// Send a templated email; returns whether the provider accepted it
    pub async fn send_email(&self, to: &str, template: &EmailTemplate) -> bool {
        match self.email.send(EmailMessage::from_template(to, template)).await {
            Ok(id) => {
                info!("Sent email {} to {}", id, to);
                true
            }
            Err(e) => {
                warn!("Failed to send email to {}: {}", to, e);
                false
            }
        }
    }

    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        query: ListNotificationsQuery,
    ) -> Result<Vec<Notification>, ServiceError> {
        let (page, limit) = clamp_page(query.page, query.limit, 50, 200);
        let offset = page_offset(page, limit)?;
        Ok(self
            .repo
            .list_for_user(user_id, query.unread_only, Pagination { offset, limit })
            .await?)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, ServiceError> {
        Ok(self.repo.count_unread(user_id).await?)
    }

    pub async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, ServiceError> {
        Ok(self.repo.mark_read(id, user_id).await?)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        Ok(self.repo.mark_all_read(user_id).await?)
    }

    pub async fn delete(&self, id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        Ok(self.repo.delete(id, user_id).await?)
    }

    async fn account_notice(&self, user: &User, title: String, message: String, template: EmailTemplate) {
        let input = NotifyInput {
            user_id: user.id,
            kind: NotificationKind::Account,
            title,
            message,
        };
        if let Err(e) = self.notify(input, None).await {
            warn!("Failed to store account notification for {}: {}", user.id, e);
        }
        self.send_email(&user.email, &template).await;
    }
}

/// Tells users about changes to their own account, in-app and by email
pub struct AccountNotifier {
    notifications: Arc<NotificationService>,
}

impl AccountNotifier {
    pub fn new(notifications: Arc<NotificationService>) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl UserNotifier for AccountNotifier {
    async fn user_created(&self, user: &User) {
        self.notifications
            .send_email(&user.email, &EmailTemplate::Welcome { name: user.name.clone() })
            .await;
    }

    async fn status_changed(&self, user: &User) {
        self.notifications
            .account_notice(
                user,
                "Account status changed".to_string(),
                format!("Your account is now {}.", user.status),
                EmailTemplate::StatusChanged {
                    name: user.name.clone(),
                    status: user.status,
                },
            )
            .await;
    }

    async fn role_changed(&self, user: &User) {
        self.notifications
            .account_notice(
                user,
                "Role changed".to_string(),
                format!("Your role is now {}.", user.role),
                EmailTemplate::RoleChanged {
                    name: user.name.clone(),
                    role: user.role,
                },
            )
            .await;
    }
}

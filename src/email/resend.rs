use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{EmailError, EmailMessage, EmailSender};

/// Client for the Resend HTTP API (`POST /emails`)
#[derive(Debug, Clone)]
pub struct ResendEmailSender {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    from: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

impl ResendEmailSender {
    pub fn new(api_key: String, base_url: String, from: String, timeout: Duration) -> Result<Self, EmailError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            from,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/emails", self.base_url)
    }
}

#[async_trait]
impl EmailSender for ResendEmailSender {
    async fn send(&self, message: EmailMessage) -> Result<String, EmailError> {
        if !message.to.contains('@') {
            return Err(EmailError::InvalidRecipient(message.to));
        }

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&json!({
                "from": self.from,
                "to": [message.to],
                "subject": message.subject,
                "html": message.html,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Resend returned {}: {}", status, body);
            return Err(EmailError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let sent: SendResponse = response.json().await?;
        tracing::debug!("Email {} accepted by Resend", sent.id);
        Ok(sent.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::{
        extract::State,
        http::{header, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::Value;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Stand-in for the provider: answers every POST /emails with a fixed reply
    #[derive(Clone)]
    struct FakeResend {
        status: StatusCode,
        reply: Value,
        seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
    }

    impl FakeResend {
        fn replying(status: StatusCode, reply: Value) -> Self {
            Self {
                status,
                reply,
                seen: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    async fn emails(
        State(fake): State<FakeResend>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        fake.seen.lock().unwrap().push((auth, body));
        (fake.status, Json(fake.reply.clone()))
    }

    async fn serve(fake: FakeResend) -> String {
        let port = portpicker::pick_unused_port().expect("no free port");
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        let app = Router::new().route("/emails", post(emails)).with_state(fake);
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://127.0.0.1:{}", port)
    }

    fn sender(base_url: String, timeout: Duration) -> ResendEmailSender {
        ResendEmailSender::new(
            "re_test".to_string(),
            base_url,
            "UserHub <noreply@userhub.dev>".to_string(),
            timeout,
        )
        .unwrap()
    }

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Welcome".to_string(),
            html: "<p>Hi</p>".to_string(),
        }
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let sender = sender("https://api.resend.com/".to_string(), TIMEOUT);
        assert_eq!(sender.endpoint(), "https://api.resend.com/emails");
    }

    #[tokio::test]
    async fn invalid_recipient_short_circuits() {
        let sender = sender("http://127.0.0.1:9".to_string(), TIMEOUT);
        assert!(matches!(
            sender.send(message("not-an-address")).await,
            Err(EmailError::InvalidRecipient(_))
        ));
    }

    #[tokio::test]
    async fn accepted_message_returns_provider_id() {
        let fake = FakeResend::replying(StatusCode::OK, json!({"id": "email_123"}));
        let seen = fake.seen.clone();
        let base_url = serve(fake).await;

        let id = sender(base_url, TIMEOUT).send(message("ada@example.com")).await.unwrap();
        assert_eq!(id, "email_123");

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer re_test"));
        assert_eq!(body["from"], "UserHub <noreply@userhub.dev>");
        assert_eq!(body["to"], json!(["ada@example.com"]));
        assert_eq!(body["subject"], "Welcome");
        assert_eq!(body["html"], "<p>Hi</p>");
    }

    #[tokio::test]
    async fn rejected_message_reports_status_and_body() {
        let fake = FakeResend::replying(
            StatusCode::UNPROCESSABLE_ENTITY,
            json!({"name": "validation_error", "message": "Invalid `to` field"}),
        );
        let base_url = serve(fake).await;

        match sender(base_url, TIMEOUT).send(message("ada@example.com")).await {
            Err(EmailError::Provider { status, body }) => {
                assert_eq!(status, 422);
                assert!(body.contains("validation_error"));
                assert!(body.contains("Invalid `to` field"));
            }
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn unresponsive_provider_times_out() {
        let port = portpicker::pick_unused_port().expect("no free port");
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await.unwrap();
        // Accept and hold the connection without ever answering
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let sender = sender(format!("http://127.0.0.1:{}", port), Duration::from_millis(200));
        match sender.send(message("ada@example.com")).await {
            Err(EmailError::Transport(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}

use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;

use super::config::{load_session, resolve_server};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin HTTP client for the userhub API envelope
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            token,
        })
    }

    /// Client without credentials, for health and login
    pub fn anonymous(server: Option<String>) -> anyhow::Result<Self> {
        let session = load_session().ok().flatten();
        Self::new(resolve_server(server, session.as_ref()), None)
    }

    /// Client carrying the saved session token
    pub fn authenticated(server: Option<String>) -> anyhow::Result<Self> {
        let session = load_session()?.ok_or_else(|| anyhow!("Not logged in; run `userhub login <email>`"))?;
        if session.is_expired() {
            bail!("Session for {} has expired; run `userhub login` again", session.email);
        }
        Self::new(resolve_server(server, Some(&session)), Some(session.token))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Value> {
        self.send(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize>(&self, path: &str, body: &B) -> anyhow::Result<Value> {
        self.send(self.request(Method::POST, path).json(body)).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send and unwrap `{"success": true, "data": ...}`
    async fn send(&self, builder: RequestBuilder) -> anyhow::Result<Value> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("could not reach {}", self.base_url))?;
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        unwrap_envelope(status, body)
    }
}

fn unwrap_envelope(status: StatusCode, mut body: Value) -> anyhow::Result<Value> {
    if status.is_success() && body["success"] == Value::Bool(true) {
        return Ok(body["data"].take());
    }

    let message = body["error"].as_str().unwrap_or("request failed").to_string();
    match body["field_errors"].as_object() {
        Some(fields) if !fields.is_empty() => {
            let details: Vec<String> = fields
                .iter()
                .map(|(field, msg)| format!("{}: {}", field, msg.as_str().unwrap_or_default()))
                .collect();
            bail!("{} ({}): {}", message, status, details.join(", "))
        }
        _ => bail!("{} ({})", message, status),
    }
}

use chrono::{Duration, Utc};
use serde_json::json;

use crate::cli::client::ApiClient;
use crate::cli::config::{save_session, Session};
use crate::cli::utils::{field, output_success};
use crate::cli::OutputFormat;

/// Exchange credentials for a token and save it for later commands
pub async fn login(
    server: Option<String>,
    email: &str,
    password: &str,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let client = ApiClient::anonymous(server)?;
    let data = client
        .post("/auth/login", &json!({ "email": email, "password": password }))
        .await?;

    let token = data["token"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("login response did not include a token"))?;
    let expires_in = data["expires_in"].as_i64().unwrap_or(0);

    let session = Session {
        server: client.base_url().to_string(),
        email: field(&data["user"], "email"),
        token: token.to_string(),
        expires_at: Utc::now() + Duration::seconds(expires_in),
    };
    save_session(&session)?;

    output_success(
        output_format,
        &format!("Logged in as {} ({})", session.email, field(&data["user"], "role")),
        Some(json!({ "user": data["user"], "expires_at": session.expires_at })),
    )
}

use clap::Subcommand;
use serde_json::Value;

use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_json, render_table};
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum NotificationsCommands {
    #[command(about = "List your notifications, newest first")]
    List {
        #[arg(long, help = "Only unread notifications")]
        unread: bool,
    },
}

pub async fn handle(
    cmd: NotificationsCommands,
    server: Option<String>,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let client = ApiClient::authenticated(server)?;

    match cmd {
        NotificationsCommands::List { unread } => {
            let path = if unread {
                "/api/notifications?unread_only=true"
            } else {
                "/api/notifications"
            };
            let data = client.get(path).await?;
            match output_format {
                OutputFormat::Json => output_json(&data),
                OutputFormat::Text => {
                    print_notifications(&data);
                    Ok(())
                }
            }
        }
    }
}

fn print_notifications(data: &Value) {
    let rows: Vec<Vec<String>> = data
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|n| {
                    let read = if n["read"].as_bool().unwrap_or(false) { " " } else { "*" };
                    vec![read.to_string(), field(n, "created_at"), field(n, "kind"), field(n, "title")]
                })
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() {
        println!("No notifications");
        return;
    }
    println!("{}", render_table(&["", "WHEN", "KIND", "TITLE"], &rows));
}

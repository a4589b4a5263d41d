use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::client::ApiClient;
use crate::cli::utils::{field, output_json, render_bulk_report, render_table};
use crate::cli::OutputFormat;
use crate::types::{UserRole, UserStatus};

#[derive(Subcommand)]
pub enum UsersCommands {
    #[command(about = "List users")]
    List {
        #[arg(long, help = "Page number, starting at 1")]
        page: Option<i64>,
        #[arg(long, help = "Page size")]
        limit: Option<i64>,
        #[arg(long, help = "Only users with this role")]
        role: Option<UserRole>,
        #[arg(long, help = "Only users with this status")]
        status: Option<UserStatus>,
        #[arg(long, help = "Match email or name")]
        search: Option<String>,
    },

    #[command(about = "Set the status of many users; failures are reported per id")]
    BulkStatus {
        #[arg(help = "active, inactive, suspended or pending")]
        status: UserStatus,
        #[arg(required = true, help = "User ids")]
        ids: Vec<String>,
    },

    #[command(about = "Set the role of many users; failures are reported per id")]
    BulkRole {
        #[arg(help = "user, moderator or admin")]
        role: UserRole,
        #[arg(required = true, help = "User ids")]
        ids: Vec<String>,
    },
}

pub async fn handle(cmd: UsersCommands, server: Option<String>, output_format: OutputFormat) -> anyhow::Result<()> {
    let client = ApiClient::authenticated(server)?;

    match cmd {
        UsersCommands::List {
            page,
            limit,
            role,
            status,
            search,
        } => {
            let path = list_path(page, limit, role, status, search.as_deref());
            let data = client.get(&path).await?;
            match output_format {
                OutputFormat::Json => output_json(&data),
                OutputFormat::Text => {
                    print_users(&data);
                    Ok(())
                }
            }
        }
        UsersCommands::BulkStatus { status, ids } => {
            let data = client
                .post("/api/users/bulk/status", &json!({ "ids": ids, "status": status }))
                .await?;
            print_bulk(&data, output_format)
        }
        UsersCommands::BulkRole { role, ids } => {
            let data = client
                .post("/api/users/bulk/role", &json!({ "ids": ids, "role": role }))
                .await?;
            print_bulk(&data, output_format)
        }
    }
}

fn list_path(
    page: Option<i64>,
    limit: Option<i64>,
    role: Option<UserRole>,
    status: Option<UserStatus>,
    search: Option<&str>,
) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    if let Some(page) = page {
        query.append_pair("page", &page.to_string());
    }
    if let Some(limit) = limit {
        query.append_pair("limit", &limit.to_string());
    }
    if let Some(role) = role {
        query.append_pair("role", role.as_str());
    }
    if let Some(status) = status {
        query.append_pair("status", status.as_str());
    }
    if let Some(search) = search {
        query.append_pair("search", search);
    }

    let query = query.finish();
    if query.is_empty() {
        "/api/users".to_string()
    } else {
        format!("/api/users?{}", query)
    }
}

fn print_users(page: &Value) {
    let rows: Vec<Vec<String>> = page["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|u| vec![field(u, "id"), field(u, "email"), field(u, "name"), field(u, "role"), field(u, "status")])
                .collect()
        })
        .unwrap_or_default();

    if rows.is_empty() {
        println!("No users found");
        return;
    }
    println!("{}", render_table(&["ID", "EMAIL", "NAME", "ROLE", "STATUS"], &rows));
    println!(
        "\nPage {} ({} per page), {} total",
        field(page, "page"),
        field(page, "limit"),
        field(page, "total")
    );
}

fn print_bulk(report: &Value, output_format: OutputFormat) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => output_json(report),
        OutputFormat::Text => {
            println!("{}", render_bulk_report(report));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_path_encodes_filters() {
        assert_eq!(list_path(None, None, None, None, None), "/api/users");
        assert_eq!(
            list_path(Some(2), Some(10), Some(UserRole::Admin), None, Some("a b")),
            "/api/users?page=2&limit=10&role=admin&search=a+b"
        );
    }
}

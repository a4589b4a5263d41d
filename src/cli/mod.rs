pub mod client;
pub mod commands;
pub mod config;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "userhub")]
#[command(about = "userhub CLI - administer a running userhub-api server")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(
        long,
        global = true,
        env = "USERHUB_URL",
        help = "Server base URL (defaults to the saved session, then http://localhost:3000)"
    )]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check server health")]
    Health,

    #[command(about = "Sign in and save the session token")]
    Login {
        #[arg(help = "Account email")]
        email: String,
        #[arg(long, env = "USERHUB_PASSWORD", hide_env_values = true, help = "Account password")]
        password: String,
    },

    #[command(about = "User administration (admin role required)")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UsersCommands,
    },

    #[command(about = "Your notifications")]
    Notifications {
        #[command(subcommand)]
        cmd: commands::notifications::NotificationsCommands,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let server = cli.server;

    match cli.command {
        Commands::Health => commands::health::handle(server, output_format).await,
        Commands::Login { email, password } => {
            commands::auth::login(server, &email, &password, output_format).await
        }
        Commands::Users { cmd } => commands::users::handle(cmd, server, output_format).await,
        Commands::Notifications { cmd } => commands::notifications::handle(cmd, server, output_format).await,
    }
}

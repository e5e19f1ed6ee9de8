use clap::Parser;

mod admin;
mod app;
mod auth;
mod catalog;
mod cli;
mod config;
mod db;
mod error;
mod health;
mod pagination;
mod state;
mod users;
mod validation;

#[cfg(test)]
mod testing;

use crate::admin::services::{ensure_admin, AdminBootstrap};
use crate::cli::{Cli, Command, CreateAdminArgs};
use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::CreateAdmin(args) => create_admin(config, args).await,
    }
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "storefront=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::init(config).await?;
    let config = state.config.clone();
    let app = app::build_app(state);
    app::serve(app, &config).await
}

async fn create_admin(config: AppConfig, args: CreateAdminArgs) -> anyhow::Result<()> {
    let state = AppState::init(config).await?;
    let (user, outcome) = ensure_admin(
        state.users.as_ref(),
        &args.email,
        &args.username,
        args.password.as_deref(),
    )
    .await?;

    match outcome {
        AdminBootstrap::Created => tracing::info!(user_id = %user.id, email = %user.email, "admin account created"),
        AdminBootstrap::Promoted => tracing::info!(user_id = %user.id, username = %user.username, "existing account promoted to admin"),
        AdminBootstrap::AlreadyAdmin => tracing::info!(user_id = %user.id, "account is already an admin"),
    }
    Ok(())
}

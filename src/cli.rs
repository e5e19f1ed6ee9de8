use clap::{Parser, Subcommand};

/// User accounts and product catalog REST API.
#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default)
    Serve,

    /// Create an admin account, or promote the matching existing account
    CreateAdmin(CreateAdminArgs),
}

#[derive(Parser, Debug)]
pub struct CreateAdminArgs {
    #[arg(long, env = "ADMIN_EMAIL")]
    pub email: String,

    #[arg(long, env = "ADMIN_USERNAME", default_value = "admin")]
    pub username: String,

    /// Required only when the account does not exist yet
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

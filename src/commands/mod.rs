//! CLI command definitions and dispatch.

pub mod health;
pub mod login;
pub mod logout;
pub mod migrate;
pub mod refresh;
pub mod session;
pub mod validate;

use clap::{Parser, Subcommand};

use passgate_auth::AuthError;
use passgate_core::config::AppConfig;
use passgate_core::error::AppError;

use crate::output::OutputFormat;

/// Passgate: session and refresh-token lifecycle administration
#[derive(Debug, Parser)]
#[command(name = "passgate", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Check database and cache connectivity
    Health,
    /// Open a session with email and password
    Login(login::LoginArgs),
    /// Exchange a refresh token for a new token pair
    Refresh(refresh::RefreshArgs),
    /// End a session
    Logout(logout::LogoutArgs),
    /// Check whether an access token is currently usable
    Validate(validate::ValidateArgs),
    /// Session administration
    Session(session::SessionArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self, config: &AppConfig) -> Result<(), AppError> {
        match &self.command {
            Commands::Migrate => migrate::execute(config).await,
            Commands::Health => health::execute(config).await,
            Commands::Login(args) => login::execute(args, config, self.format).await,
            Commands::Refresh(args) => refresh::execute(args, config, self.format).await,
            Commands::Logout(args) => logout::execute(args, config).await,
            Commands::Validate(args) => validate::execute(args, config, self.format).await,
            Commands::Session(args) => session::execute(args, config, self.format).await,
        }
    }
}

/// Helper: turn a session-layer failure into a printable error
pub fn auth_failure(err: AuthError) -> AppError {
    if err.is_internal() {
        AppError::internal("Session operation failed; see logs for details")
    } else {
        AppError::validation(format!("{} ({})", err, err.code()))
    }
}

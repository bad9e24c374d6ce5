//! Session logout.

use clap::Args;

use passgate_core::config::AppConfig;
use passgate_core::error::AppError;

use crate::{output, services};

/// Arguments for the logout command
#[derive(Debug, Args)]
pub struct LogoutArgs {
    /// Session identifier
    pub session_id: String,
}

/// Execute the logout command
pub async fn execute(args: &LogoutArgs, config: &AppConfig) -> Result<(), AppError> {
    let orchestrator = services::orchestrator(config).await?;
    orchestrator
        .logout(&args.session_id)
        .await
        .map_err(super::auth_failure)?;

    output::print_success(&format!("Session {} logged out", args.session_id));
    Ok(())
}

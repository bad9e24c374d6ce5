//! Refresh-token exchange.

use clap::Args;

use passgate_core::config::AppConfig;
use passgate_core::error::AppError;

use crate::output::{self, OutputFormat};
use crate::services;

/// Arguments for the refresh command
#[derive(Debug, Args)]
pub struct RefreshArgs {
    /// Refresh token to consume
    pub token: String,

    /// Client IP address recorded on the session
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// Device description recorded on the session
    #[arg(long, default_value = "passgate-cli")]
    pub device: String,
}

/// Execute the refresh command
pub async fn execute(
    args: &RefreshArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let orchestrator = services::orchestrator(config).await?;
    let bundle = orchestrator
        .refresh(&args.token, &args.ip, &args.device)
        .await
        .map_err(super::auth_failure)?;

    output::print_item(&bundle, format);
    Ok(())
}

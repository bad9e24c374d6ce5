//! Interactive login.

use clap::Args;

use passgate_core::config::AppConfig;
use passgate_core::error::AppError;

use crate::output::{self, OutputFormat};
use crate::services;

/// Arguments for the login command
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Account email
    pub email: String,

    /// Password (prompted if omitted)
    #[arg(long)]
    pub password: Option<String>,

    /// Client IP address recorded on the session
    #[arg(long, default_value = "127.0.0.1")]
    pub ip: String,

    /// Device description recorded on the session
    #[arg(long, default_value = "passgate-cli")]
    pub device: String,
}

/// Execute the login command
pub async fn execute(
    args: &LoginArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let password = match &args.password {
        Some(p) => p.clone(),
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?,
    };

    let orchestrator = services::orchestrator(config).await?;
    let bundle = orchestrator
        .login(&args.email, &password, &args.ip, &args.device)
        .await
        .map_err(super::auth_failure)?;

    output::print_item(&bundle, format);
    Ok(())
}

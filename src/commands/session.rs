//! Session administration commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use passgate_auth::RevokeOutcome;
use passgate_core::config::AppConfig;
use passgate_core::error::AppError;

use crate::output::{self, OutputFormat};
use crate::services;

/// Arguments for session commands
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Session subcommand
    #[command(subcommand)]
    pub command: SessionCommand,
}

/// Session subcommands
#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// List active sessions of a user
    List {
        /// User ID
        user_id: Uuid,
    },
    /// Revoke one session
    Revoke {
        /// Session identifier
        session_id: String,
        /// Reason recorded on the session
        #[arg(long, default_value = "revoked by administrator")]
        reason: String,
    },
    /// Revoke every session of a user
    RevokeUser {
        /// User ID
        user_id: Uuid,
        /// Reason recorded on each session
        #[arg(long, default_value = "revoked by administrator")]
        reason: String,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
    /// Record activity on a session
    Touch {
        /// Session identifier
        session_id: String,
    },
}

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct SessionRow {
    /// Session ID
    session_id: String,
    /// IP Address
    ip: String,
    /// Device
    device: String,
    /// Last Active
    last_active: String,
    /// Expires
    expires: String,
}

/// Execute session commands
pub async fn execute(
    args: &SessionArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        SessionCommand::List { user_id } => {
            let orchestrator = services::orchestrator(config).await?;
            let sessions = orchestrator
                .active_sessions(*user_id)
                .await
                .map_err(super::auth_failure)?;

            let rows: Vec<SessionRow> = sessions
                .iter()
                .map(|s| SessionRow {
                    session_id: s.session_id.clone(),
                    ip: s.ip_address.clone(),
                    device: s.device_info.clone(),
                    last_active: s.last_active.format("%Y-%m-%d %H:%M:%S").to_string(),
                    expires: s.expires_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                })
                .collect();

            output::print_list(&rows, format);
        }
        SessionCommand::Revoke { session_id, reason } => {
            let orchestrator = services::orchestrator(config).await?;
            let outcome = orchestrator
                .revoke_session(session_id, reason)
                .await
                .map_err(super::auth_failure)?;

            match outcome {
                RevokeOutcome::Revoked => {
                    output::print_success(&format!("Session {} revoked", session_id))
                }
                RevokeOutcome::AlreadyRevoked => {
                    output::print_warning(&format!("Session {} was already revoked", session_id))
                }
                RevokeOutcome::NotFound => {
                    return Err(AppError::not_found(format!(
                        "Session {} not found",
                        session_id
                    )));
                }
            }
        }
        SessionCommand::RevokeUser {
            user_id,
            reason,
            force,
        } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!("Revoke ALL sessions of user {}?", user_id))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {}", e)))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let orchestrator = services::orchestrator(config).await?;
            let count = orchestrator
                .revoke_all_user_sessions(*user_id, reason)
                .await
                .map_err(super::auth_failure)?;

            output::print_success(&format!("Revoked {} sessions", count));
        }
        SessionCommand::Touch { session_id } => {
            let orchestrator = services::orchestrator(config).await?;
            let touched = orchestrator
                .touch_session(session_id)
                .await
                .map_err(super::auth_failure)?;

            if touched {
                output::print_success(&format!("Session {} touched", session_id));
            } else {
                return Err(AppError::not_found(format!(
                    "No active session {}",
                    session_id
                )));
            }
        }
    }

    Ok(())
}

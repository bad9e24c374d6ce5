//! Access-token check.

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use uuid::Uuid;

use passgate_auth::TokenValidation;
use passgate_core::config::AppConfig;
use passgate_core::error::AppError;

use crate::output::{self, OutputFormat};
use crate::services;

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Access token to check
    pub token: String,
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    status: &'static str,
    reason: Option<String>,
    user_id: Option<Uuid>,
    session_id: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    expires_in_seconds: Option<u64>,
}

/// Execute the validate command
pub async fn execute(
    args: &ValidateArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let (validator, codec) = services::validator(config).await?;
    let validation = validator.is_usable(&args.token).await;

    let report = match &validation {
        TokenValidation::Usable(claims) => ValidationReport {
            status: "usable",
            reason: None,
            user_id: Some(claims.user_id()),
            session_id: Some(claims.sid.clone()),
            expires_at: Some(claims.expires_at()),
            expires_in_seconds: Some(claims.remaining_ttl_seconds()),
        },
        TokenValidation::Rejected(reason) => ValidationReport {
            status: "rejected",
            reason: Some(format!("{reason:?}")),
            user_id: None,
            session_id: codec.peek_session_id(&args.token),
            expires_at: None,
            expires_in_seconds: None,
        },
        TokenValidation::Unconfirmed => ValidationReport {
            status: "unconfirmed",
            reason: Some("session cache unavailable".to_string()),
            user_id: None,
            session_id: codec.peek_session_id(&args.token),
            expires_at: None,
            expires_in_seconds: None,
        },
    };

    output::print_item(&report, format);
    if validation.is_usable() {
        Ok(())
    } else {
        Err(AppError::validation("Access token is not usable"))
    }
}

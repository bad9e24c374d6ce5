//! Database migration command.

use passgate_core::config::AppConfig;
use passgate_core::error::AppError;

use crate::{output, services};

/// Run all pending migrations
pub async fn execute(config: &AppConfig) -> Result<(), AppError> {
    let db = services::connect_database(config).await?;

    println!("Running database migrations...");
    passgate_database::migration::run_migrations(db.pool()).await?;
    output::print_success("All migrations applied successfully.");

    db.close().await;
    Ok(())
}

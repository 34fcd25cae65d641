//! Database migration management.

use sqlx::PgPool;

use crate::error::StoreError;

/// Run all pending migrations, embedded at compile time from the
/// `migrations/` directory.
///
/// # Errors
///
/// Returns `StoreError::MigrationFailed` if any migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), StoreError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Migrations complete");
    Ok(())
}

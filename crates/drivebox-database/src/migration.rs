//! Schema migrations for the entry tree.

use sqlx::PgPool;
use sqlx::migrate::Migrator;
use tracing::info;

use drivebox_core::error::{AppError, ErrorKind};

/// Embedded migrations. `0001_create_entries.sql` carries the entries
/// table together with its tree constraints and the partial unique index
/// on live paths.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// Apply every migration not yet recorded in the target database.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    info!(
        migrations = MIGRATOR.migrations.len(),
        "Applying schema migrations"
    );

    MIGRATOR.run(pool).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Database,
            format!("Failed to run migrations: {e}"),
            e,
        )
    })?;

    info!("Schema is up to date");
    Ok(())
}

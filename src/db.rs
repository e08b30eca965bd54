use anyhow::{Context, Result, anyhow};
use diesel::{Connection, PgConnection};
use diesel_async::{
    AsyncPgConnection, RunQueryDsl,
    pooled_connection::{AsyncDieselConnectionManager, bb8::Pool},
};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness};

use crate::{aliases::DbPool, app_error::AppError, config::DatabaseConfig};

/// Builds the connection pool without opening a connection; the first
/// checkout connects.
pub fn create_pool(config: &DatabaseConfig) -> DbPool {
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(config.url.clone());
    Pool::builder()
        .max_size(config.max_connections)
        .connection_timeout(config.acquire_timeout)
        .build_unchecked(manager)
}

/// Runs pending migrations over a blocking connection and returns how many
/// were applied.
pub async fn run_migrations_blocking(migrations: EmbeddedMigrations, url: &str) -> Result<usize> {
    let url = url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn =
            PgConnection::establish(&url).context("Failed to connect to the database for migrations")?;
        let applied = conn
            .run_pending_migrations(migrations)
            .map_err(|err| anyhow!("Failed to run migrations: {}", err))?;
        Ok(applied.len())
    })
    .await
    .context("Migration task panicked")?
}

/// Bounds row-lock waits for the rest of the current transaction.
pub async fn set_lock_timeout(conn: &mut AsyncPgConnection, lock_timeout_ms: u64) -> Result<(), AppError> {
    diesel::sql_query(format!("SET LOCAL lock_timeout = {}", lock_timeout_ms))
        .execute(conn)
        .await?;
    Ok(())
}

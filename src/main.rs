use anyhow::Result;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use mediquick_orderservice::{
    app_state::AppState,
    bootstrap::{self, bootstrap},
    config, db, routes,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let server = config.server.clone();
    let app = routes::app(AppState::init(config));

    tracing::info!("Bootstrapping...");
    bootstrap("OrderService", app, &server).await?;
    Ok(())
}

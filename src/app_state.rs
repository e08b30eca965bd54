use std::sync::Arc;

use reqwest::Client;

use crate::{
    aliases::{DbConn, DbPool},
    api::geocoding::{Geocoder, HttpGeocoder, StubGeocoder},
    app_error::AppError,
    config::Config,
    db,
    domain::allocator::StockAllocator,
};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub http_client: Client,
    pub config: Arc<Config>,
    pub allocator: Arc<dyn StockAllocator>,
    pub geocoder: Arc<dyn Geocoder>,
}

impl AppState {
    pub fn init(config: Config) -> Self {
        let db_pool = db::create_pool(&config.database);
        let http_client = Client::new();
        let allocator = config.allocation_policy.allocator();
        let geocoder: Arc<dyn Geocoder> = match &config.geocoding_url {
            Some(url) => Arc::new(HttpGeocoder::new(http_client.clone(), url.clone())),
            None => Arc::new(StubGeocoder),
        };

        tracing::info!(
            "Pharmacy allocation policy: {}, geocoder: {}",
            allocator.name(),
            if config.geocoding_url.is_some() { "http" } else { "stub" }
        );

        Self {
            db_pool,
            http_client,
            config: Arc::new(config),
            allocator,
            geocoder,
        }
    }

    /// Checks a connection out of the pool, bounded by the acquire timeout.
    pub async fn conn(&self) -> Result<DbConn<'_>, AppError> {
        Ok(self.db_pool.get().await?)
    }

    pub fn lock_timeout_ms(&self) -> u64 {
        self.config.database.lock_timeout_ms
    }
}

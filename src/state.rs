//! Application state

use crate::cache::ReadCache;
use crate::config::Config;
use crate::db::DbService;
use crate::error::AppResult;
use crate::services::{OrderService, TableService};
use std::time::Duration;

/// Shared application state: database, read cache and the two core services
#[derive(Clone)]
pub struct AppState {
    pub db: DbService,
    pub cache: ReadCache,
    pub orders: OrderService,
    pub tables: TableService,
}

impl AppState {
    pub async fn initialize(config: &Config) -> AppResult<Self> {
        let db = DbService::new(&config.database_path).await?;
        let cache = ReadCache::new(Duration::from_secs(config.cache_ttl_secs));
        let tables = TableService::new(db.pool.clone(), cache.clone());
        let orders = OrderService::new(db.pool.clone(), cache.clone());
        Ok(Self {
            db,
            cache,
            orders,
            tables,
        })
    }
}

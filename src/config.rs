//! Server configuration

/// Runtime configuration, sourced from environment variables with
/// development defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path (env: COMANDA_DB_PATH)
    pub database_path: String,
    /// Seconds between table reconciliation sweeps (env: COMANDA_RECONCILE_INTERVAL_SECS)
    pub reconcile_interval_secs: u64,
    /// TTL for cached read responses (env: COMANDA_CACHE_TTL_SECS)
    pub cache_ttl_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_path: std::env::var("COMANDA_DB_PATH")
                .unwrap_or_else(|_| "comanda.db".to_string()),
            reconcile_interval_secs: env_u64("COMANDA_RECONCILE_INTERVAL_SECS", 60),
            cache_ttl_secs: env_u64("COMANDA_CACHE_TTL_SECS", 30),
        }
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

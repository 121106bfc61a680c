//! Derived read cache
//!
//! TTL-bounded, best-effort cache of serialized read responses. Mutations
//! invalidate (never update) the affected entries. Keys are derived
//! deterministically from entity ids, so invalidation is a couple of exact
//! removals rather than a key scan.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Key for the recent-orders listing
pub const ORDER_LIST_KEY: &str = "orders:list";

/// Key for the tables-with-active-orders listing
pub const TABLE_LIST_KEY: &str = "tables:active";

/// Key for a single table's read responses
pub fn table_key(table_id: i64) -> String {
    format!("table:{table_id}")
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Shared TTL cache; readers may see data at most one TTL old.
#[derive(Debug, Clone)]
pub struct ReadCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Fetch a cached response, dropping it if the TTL has elapsed.
    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Called after an order mutation commits: drops both listings and, when
    /// the order sits on a table, that table's entry. Fire-and-forget — the
    /// mutation has already succeeded by the time this runs.
    pub fn invalidate_order_mutation(&self, table_id: Option<i64>) {
        self.entries.remove(ORDER_LIST_KEY);
        self.entries.remove(TABLE_LIST_KEY);
        if let Some(id) = table_id {
            self.entries.remove(&table_key(id));
        }
        tracing::debug!(?table_id, "read cache invalidated after order mutation");
    }

    /// Called after a table status write commits.
    pub fn invalidate_table(&self, table_id: i64) {
        self.entries.remove(TABLE_LIST_KEY);
        self.entries.remove(&table_key(table_id));
        tracing::debug!(table_id, "read cache invalidated after table mutation");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entries_expire_after_ttl() {
        let cache = ReadCache::new(Duration::from_millis(0));
        cache.put(ORDER_LIST_KEY, json!([1, 2, 3]));
        assert_eq!(cache.get(ORDER_LIST_KEY), None);
    }

    #[test]
    fn entries_live_within_ttl() {
        let cache = ReadCache::new(Duration::from_secs(60));
        cache.put(table_key(5), json!({"status": "occupied"}));
        assert_eq!(
            cache.get(&table_key(5)),
            Some(json!({"status": "occupied"}))
        );
    }

    #[test]
    fn order_mutation_drops_listings_and_table() {
        let cache = ReadCache::new(Duration::from_secs(60));
        cache.put(ORDER_LIST_KEY, json!([]));
        cache.put(TABLE_LIST_KEY, json!([]));
        cache.put(table_key(5), json!({}));
        cache.put(table_key(6), json!({}));

        cache.invalidate_order_mutation(Some(5));

        assert_eq!(cache.get(ORDER_LIST_KEY), None);
        assert_eq!(cache.get(TABLE_LIST_KEY), None);
        assert_eq!(cache.get(&table_key(5)), None);
        // Unrelated table untouched
        assert!(cache.get(&table_key(6)).is_some());
    }
}

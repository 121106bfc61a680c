//! Table State Manager
//!
//! Sole writer of `dining_tables.status` for automatically managed tables.
//! The stored status is a cache of a derived predicate — "does this table
//! have an active order" — so conflict checks and the reconciliation sweep
//! re-derive it from the orders table instead of trusting the flag.

use crate::cache::{self, ReadCache};
use crate::db::dining_tables::{self, DiningTable, TableStatus};
use crate::db::{self, orders};
use crate::error::{AppError, AppResult};
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct TableService {
    pool: SqlitePool,
    cache: ReadCache,
}

/// A table together with the orders currently keeping it occupied
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TableWithOrders {
    pub table: DiningTable,
    pub active_orders: Vec<orders::Order>,
}

impl TableService {
    pub fn new(pool: SqlitePool, cache: ReadCache) -> Self {
        Self { pool, cache }
    }

    // ========== Transaction-scoped operations ==========

    /// Direct status write inside the caller's transaction. `NotFound` when
    /// the table is missing or soft-deleted.
    pub async fn set_status(
        conn: &mut SqliteConnection,
        table_id: i64,
        status: TableStatus,
    ) -> AppResult<DiningTable> {
        let affected = dining_tables::set_status(conn, table_id, status, db::now_millis()).await?;
        if affected == 0 {
            return Err(AppError::NotFound(format!(
                "Dining table {table_id} not found"
            )));
        }
        dining_tables::find_by_id(conn, table_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Dining table {table_id} not found")))
    }

    /// Does the table have at least one non-terminal order?
    pub async fn has_active_orders(
        conn: &mut SqliteConnection,
        table_id: i64,
    ) -> AppResult<bool> {
        Ok(orders::count_active_for_table(conn, table_id).await? > 0)
    }

    /// Reject attaching a new order to a table that already has one. The
    /// active-order count is authoritative even when the stored status still
    /// says `available`.
    pub async fn assert_available_for_new_order(
        conn: &mut SqliteConnection,
        table_id: i64,
    ) -> AppResult<()> {
        let table = dining_tables::find_active_by_id(conn, table_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Dining table {table_id} not found")))?;
        if Self::has_active_orders(conn, table_id).await? {
            return Err(AppError::Conflict(format!(
                "Table {} already has an active order",
                table.table_number
            )));
        }
        Ok(())
    }

    /// Correct drift between stored status and the set of active orders.
    /// Only `available`/`occupied` tables are auto-managed; `reserved` and
    /// `out_of_service` stay untouched. Writes only on mismatch, so running
    /// the sweep repeatedly or concurrently is safe.
    pub async fn reconcile(conn: &mut SqliteConnection) -> AppResult<u32> {
        // Take the write lock before reading, like order creation does with
        // its day marker. A deferred read here could be invalidated by a
        // concurrent checkout commit, and SQLITE_BUSY_SNAPSHOT on the
        // corrective write is not something busy_timeout can wait out.
        dining_tables::lock_all(conn).await?;

        let tables = dining_tables::find_auto_managed(conn).await?;
        let mut corrected = 0u32;
        for table in tables {
            let expected = if orders::count_active_for_table(conn, table.id).await? > 0 {
                TableStatus::Occupied
            } else {
                TableStatus::Available
            };
            if table.status != expected {
                dining_tables::set_status(conn, table.id, expected, db::now_millis()).await?;
                tracing::warn!(
                    table_id = table.id,
                    table_number = table.table_number,
                    from = ?table.status,
                    to = ?expected,
                    "Corrected drifted table status"
                );
                corrected += 1;
            }
        }
        Ok(corrected)
    }

    // ========== Pool-level entry points ==========

    /// Administrative status override. Bypasses the active-order conflict
    /// check by design (manual overrides); a later reconciliation sweep may
    /// revert auto-managed states that disagree with the orders table.
    pub async fn update_table_status(
        &self,
        table_id: i64,
        status: TableStatus,
    ) -> AppResult<DiningTable> {
        let mut tx = self.pool.begin().await?;
        let table = Self::set_status(&mut *tx, table_id, status).await?;
        tx.commit().await?;
        self.cache.invalidate_table(table_id);
        Ok(table)
    }

    /// Reconciliation sweep in its own transaction; the periodic entry point.
    pub async fn reconcile_tables(&self) -> AppResult<u32> {
        let mut tx = self.pool.begin().await?;
        let corrected = Self::reconcile(&mut *tx).await?;
        tx.commit().await?;
        if corrected > 0 {
            self.cache.invalidate_order_mutation(None);
        }
        Ok(corrected)
    }

    /// Every active table with the orders keeping it occupied. Self-heals
    /// first, then reads; a sweep that corrects anything drops the cached
    /// response, so the lookup below never serves drifted occupancy.
    pub async fn list_tables_with_active_orders(&self) -> AppResult<Vec<TableWithOrders>> {
        self.reconcile_tables().await?;

        if let Some(cached) = self.cache.get(cache::TABLE_LIST_KEY)
            && let Ok(parsed) = serde_json::from_value(cached)
        {
            return Ok(parsed);
        }

        let mut conn = self.pool.acquire().await?;
        let tables = dining_tables::find_all_active(&mut *conn).await?;
        let mut out = Vec::with_capacity(tables.len());
        for table in tables {
            let active_orders = orders::active_for_table(&mut *conn, table.id).await?;
            out.push(TableWithOrders {
                table,
                active_orders,
            });
        }

        match serde_json::to_value(&out) {
            Ok(value) => self.cache.put(cache::TABLE_LIST_KEY, value),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize table listing for cache"),
        }
        Ok(out)
    }

    /// Single table with the orders currently keeping it occupied; the
    /// response is cached under the table's derived key and dropped whenever
    /// an order mutation or status override touches the table.
    pub async fn get_table(&self, table_id: i64) -> AppResult<TableWithOrders> {
        let key = cache::table_key(table_id);
        if let Some(cached) = self.cache.get(&key)
            && let Ok(parsed) = serde_json::from_value(cached)
        {
            return Ok(parsed);
        }

        let mut conn = self.pool.acquire().await?;
        let table = dining_tables::find_active_by_id(&mut *conn, table_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Dining table {table_id} not found")))?;
        let active_orders = orders::active_for_table(&mut *conn, table_id).await?;
        let out = TableWithOrders {
            table,
            active_orders,
        };

        match serde_json::to_value(&out) {
            Ok(value) => self.cache.put(key, value),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize table read for cache"),
        }
        Ok(out)
    }
}

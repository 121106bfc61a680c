//! Dining table queries

use sqlx::SqliteConnection;

/// Table occupancy status. `Reserved` and `OutOfService` are only ever set
/// administratively and are excluded from automatic management.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
    OutOfService,
}

/// Dining table entity (mesa)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct DiningTable {
    pub id: i64,
    pub table_number: i64,
    pub capacity: i64,
    pub location: Option<String>,
    pub status: TableStatus,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<DiningTable>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM dining_tables WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Find a table that is not soft-deleted
pub async fn find_active_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<DiningTable>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM dining_tables WHERE id = ? AND is_active = 1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_all_active(
    conn: &mut SqliteConnection,
) -> Result<Vec<DiningTable>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM dining_tables WHERE is_active = 1 ORDER BY table_number")
        .fetch_all(conn)
        .await
}

/// Tables whose status the reconciliation sweep is allowed to rewrite
pub async fn find_auto_managed(
    conn: &mut SqliteConnection,
) -> Result<Vec<DiningTable>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM dining_tables
         WHERE is_active = 1 AND status IN ('available', 'occupied')
         ORDER BY table_number",
    )
    .fetch_all(conn)
    .await
}

/// No-op write that promotes the enclosing transaction to a writer before
/// it reads, so a concurrent commit cannot invalidate its snapshot. Rewrites
/// every row with its own value; the table is small.
pub async fn lock_all(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE dining_tables SET updated_at = updated_at")
        .execute(conn)
        .await?;
    Ok(())
}

/// Write the status flag; returns the number of rows touched (0 when the
/// table is missing or inactive).
pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: TableStatus,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("UPDATE dining_tables SET status = ?, updated_at = ? WHERE id = ? AND is_active = 1")
            .bind(status)
            .bind(now)
            .bind(id)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}

pub async fn create(
    conn: &mut SqliteConnection,
    table_number: i64,
    capacity: i64,
    location: Option<&str>,
) -> Result<DiningTable, sqlx::Error> {
    let now = super::now_millis();
    sqlx::query_as(
        "INSERT INTO dining_tables (table_number, capacity, location, status, is_active, created_at, updated_at)
         VALUES (?, ?, ?, 'available', 1, ?, ?)
         RETURNING *",
    )
    .bind(table_number)
    .bind(capacity)
    .bind(location)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
}

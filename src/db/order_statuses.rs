//! Order status lookup
//!
//! Statuses are administratively configurable rows; terminality is an
//! explicit flag resolved here, never a string comparison at call sites.

use sqlx::SqliteConnection;

/// Order status row; `is_terminal` marks the Delivered/Cancelled class after
/// which no further transitions are permitted.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct OrderStatus {
    pub id: i64,
    pub name: String,
    pub is_terminal: bool,
    pub sort_order: i64,
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<OrderStatus>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_statuses WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<OrderStatus>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_statuses WHERE name = ?")
        .bind(name)
        .fetch_optional(conn)
        .await
}

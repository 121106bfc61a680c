//! Order persistence: orders, line items, status history
//!
//! Mutations here always run inside a caller-owned transaction; the
//! coordinator in `services::order_service` decides the boundary.

use sqlx::SqliteConnection;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, sqlx::Type,
)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    DineIn,
    Takeaway,
    Delivery,
}

/// Order entity (pedido)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: i64,
    /// Date-scoped sequential number, `YYMMDD-NNNN`
    pub order_number: String,
    pub customer_id: i64,
    pub seller_id: Option<i64>,
    pub table_id: Option<i64>,
    pub status_id: i64,
    pub payment_method_id: i64,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Line item: quantity and unit-price snapshot, immutable once created
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: f64,
    pub subtotal: f64,
}

/// Append-only status history record
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, sqlx::FromRow)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub status_id: i64,
    pub comment: Option<String>,
    pub created_at: i64,
}

/// Everything needed to insert the order row itself
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: i64,
    pub seller_id: Option<i64>,
    pub table_id: Option<i64>,
    pub status_id: i64,
    pub payment_method_id: i64,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
    pub notes: Option<String>,
}

pub async fn insert_order(
    conn: &mut SqliteConnection,
    order: &NewOrder,
    now: i64,
) -> Result<Order, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO orders (
            order_number, customer_id, seller_id, table_id, status_id,
            payment_method_id, delivery_type, delivery_address,
            subtotal, tax, discount, total, notes, created_at, updated_at
         )
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&order.order_number)
    .bind(order.customer_id)
    .bind(order.seller_id)
    .bind(order.table_id)
    .bind(order.status_id)
    .bind(order.payment_method_id)
    .bind(order.delivery_type)
    .bind(&order.delivery_address)
    .bind(order.subtotal)
    .bind(order.tax)
    .bind(order.discount)
    .bind(order.total)
    .bind(&order.notes)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub async fn insert_item(
    conn: &mut SqliteConnection,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price: f64,
    subtotal: f64,
) -> Result<OrderItem, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO order_items (order_id, product_id, quantity, unit_price, subtotal)
         VALUES (?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(quantity)
    .bind(unit_price)
    .bind(subtotal)
    .fetch_one(conn)
    .await
}

pub async fn insert_history(
    conn: &mut SqliteConnection,
    order_id: i64,
    status_id: i64,
    comment: Option<&str>,
    now: i64,
) -> Result<StatusHistoryEntry, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO order_status_history (order_id, status_id, comment, created_at)
         VALUES (?, ?, ?, ?)
         RETURNING *",
    )
    .bind(order_id)
    .bind(status_id)
    .bind(comment)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub async fn find_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// No-op update that takes SQLite's write lock on the connection before any
/// read, so a status transition never works from a stale snapshot. Returns
/// false when the order does not exist.
pub async fn touch(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET updated_at = updated_at WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn update_status(
    conn: &mut SqliteConnection,
    id: i64,
    status_id: i64,
    now: i64,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE orders SET status_id = ?, updated_at = ? WHERE id = ?")
        .bind(status_id)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn items_for_order(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = ? ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await
}

pub async fn history_for_order(
    conn: &mut SqliteConnection,
    order_id: i64,
) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM order_status_history WHERE order_id = ? ORDER BY created_at, id",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await
}

/// Orders on the table whose status is not terminal — the authoritative
/// occupancy predicate.
pub async fn count_active_for_table(
    conn: &mut SqliteConnection,
    table_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders o
         JOIN order_statuses s ON o.status_id = s.id
         WHERE o.table_id = ? AND s.is_terminal = 0",
    )
    .bind(table_id)
    .fetch_one(conn)
    .await
}

pub async fn active_for_table(
    conn: &mut SqliteConnection,
    table_id: i64,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        "SELECT o.* FROM orders o
         JOIN order_statuses s ON o.status_id = s.id
         WHERE o.table_id = ? AND s.is_terminal = 0
         ORDER BY o.created_at, o.id",
    )
    .bind(table_id)
    .fetch_all(conn)
    .await
}

pub async fn list_recent(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders ORDER BY created_at DESC, id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(conn)
        .await
}

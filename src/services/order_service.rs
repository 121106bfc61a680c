//! Order Lifecycle Coordinator
//!
//! Orchestrates order creation and status transitions: sequencing, the order
//! rows themselves, and table side effects all commit in one transaction,
//! followed by best-effort cache invalidation.

use crate::cache::{self, ReadCache};
use crate::db::dining_tables::TableStatus;
use crate::db::orders::{self, DeliveryType, Order, OrderItem, StatusHistoryEntry};
use crate::db::{self, order_statuses};
use crate::error::{AppError, AppResult};
use crate::orders::money::{self, LineItemInput, OrderTotals};
use crate::orders::sequencer;
use crate::services::table_service::TableService;
use sqlx::SqlitePool;

/// Bounded retry for creation races the write lock did not catch (unique
/// violation on the order number, lost SQLite write lock).
const MAX_CREATE_ATTEMPTS: u32 = 3;

/// Status every new order enters
const INITIAL_STATUS: &str = "Pending";

/// Page size for the cached recent-orders listing
const LIST_LIMIT: i64 = 100;

/// Checkout payload, validated upstream except for the rules this core owns
/// (positive quantities, known table, monetary invariant).
#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub customer_id: i64,
    pub seller_id: Option<i64>,
    pub table_id: Option<i64>,
    pub payment_method_id: i64,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub discount: Option<f64>,
    pub notes: Option<String>,
    pub items: Vec<LineItemInput>,
}

/// Fully-populated order returned from coordinator operations
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub history: Vec<StatusHistoryEntry>,
}

#[derive(Clone)]
pub struct OrderService {
    pool: SqlitePool,
    cache: ReadCache,
}

/// Outcome of a single creation attempt: races worth a fresh transaction vs
/// errors that must surface to the caller unchanged.
enum CreateError {
    Retryable(sqlx::Error),
    Fatal(AppError),
}

impl From<sqlx::Error> for CreateError {
    fn from(e: sqlx::Error) -> Self {
        if is_retryable(&e) {
            CreateError::Retryable(e)
        } else {
            CreateError::Fatal(e.into())
        }
    }
}

impl From<AppError> for CreateError {
    fn from(e: AppError) -> Self {
        CreateError::Fatal(e)
    }
}

fn is_retryable(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            // SQLITE_BUSY (5), SQLITE_LOCKED (6), SQLITE_BUSY_SNAPSHOT (517)
            db.is_unique_violation()
                || matches!(db.code().as_deref(), Some("5") | Some("6") | Some("517"))
                || db.message().contains("database is locked")
        }
        _ => false,
    }
}

impl OrderService {
    pub fn new(pool: SqlitePool, cache: ReadCache) -> Self {
        Self { pool, cache }
    }

    /// Checkout: allocate an order number, persist the order with its line
    /// items and the "created" history entry, occupy the table if one is
    /// attached — all in one transaction, retried a bounded number of times
    /// on sequence races.
    pub async fn create_order(&self, req: CreateOrderRequest) -> AppResult<OrderDetail> {
        // Totals and quantity validation do not change across attempts
        let totals = money::order_totals(&req.items, req.discount)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create(&req, totals).await {
                Ok(detail) => {
                    self.cache.invalidate_order_mutation(req.table_id);
                    tracing::info!(
                        order_number = %detail.order.order_number,
                        table_id = ?req.table_id,
                        total = detail.order.total,
                        "Order created"
                    );
                    return Ok(detail);
                }
                Err(CreateError::Retryable(e)) if attempt < MAX_CREATE_ATTEMPTS => {
                    tracing::warn!(attempt, error = %e, "Order creation raced, retrying in a fresh transaction");
                }
                Err(CreateError::Retryable(e)) => {
                    tracing::error!(attempts = attempt, error = %e, "Order number allocation retries exhausted");
                    return Err(AppError::Conflict(
                        "order number allocation kept conflicting, try again".to_string(),
                    ));
                }
                Err(CreateError::Fatal(e)) => return Err(e),
            }
        }
    }

    /// POS variant: no pre-existing cart, a seller rings the order up
    /// directly at the counter.
    pub async fn create_direct_order(&self, req: CreateOrderRequest) -> AppResult<OrderDetail> {
        if req.seller_id.is_none() {
            return Err(AppError::Validation(
                "direct orders require a seller".to_string(),
            ));
        }
        self.create_order(req).await
    }

    async fn try_create(
        &self,
        req: &CreateOrderRequest,
        totals: OrderTotals,
    ) -> Result<OrderDetail, CreateError> {
        let day = chrono::Utc::now().date_naive();
        let mut tx = self.pool.begin().await?;

        // Write-intent lock on the day marker before any read, so concurrent
        // creators serialize here instead of racing the insert below.
        sequencer::lock_day(&mut *tx, day).await?;

        if let Some(table_id) = req.table_id {
            TableService::assert_available_for_new_order(&mut *tx, table_id).await?;
        }

        let status = order_statuses::find_by_name(&mut *tx, INITIAL_STATUS)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("initial status '{INITIAL_STATUS}' is not configured"))
            })?;

        let order_number = sequencer::next_order_number(&mut *tx, day).await?;

        let now = db::now_millis();
        let order = orders::insert_order(
            &mut *tx,
            &orders::NewOrder {
                order_number,
                customer_id: req.customer_id,
                seller_id: req.seller_id,
                table_id: req.table_id,
                status_id: status.id,
                payment_method_id: req.payment_method_id,
                delivery_type: req.delivery_type,
                delivery_address: req.delivery_address.clone(),
                subtotal: totals.subtotal,
                tax: totals.tax,
                discount: totals.discount,
                total: totals.total,
                notes: req.notes.clone(),
            },
            now,
        )
        .await?;

        let mut items = Vec::with_capacity(req.items.len());
        for item in &req.items {
            let line = money::line_subtotal(item)?;
            items.push(
                orders::insert_item(
                    &mut *tx,
                    order.id,
                    item.product_id,
                    item.quantity,
                    item.unit_price,
                    line,
                )
                .await?,
            );
        }

        let entry =
            orders::insert_history(&mut *tx, order.id, status.id, Some("created"), now).await?;

        if let Some(table_id) = req.table_id {
            TableService::set_status(&mut *tx, table_id, TableStatus::Occupied).await?;
        }

        tx.commit().await?;

        Ok(OrderDetail {
            order,
            items,
            history: vec![entry],
        })
    }

    /// Move an order to a new status, appending a history entry. Entering a
    /// terminal status releases the table when no other active order still
    /// references it.
    pub async fn transition_status(
        &self,
        order_id: i64,
        new_status_id: i64,
        comment: Option<String>,
    ) -> AppResult<OrderDetail> {
        let mut tx = self.pool.begin().await?;

        // Row lock on the order before reading; doubles as the existence check
        if !orders::touch(&mut *tx, order_id).await? {
            return Err(AppError::NotFound(format!("Order {order_id} not found")));
        }

        let order = orders::find_by_id(&mut *tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;

        let current = order_statuses::find_by_id(&mut *tx, order.status_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "order {} references unknown status {}",
                    order.order_number, order.status_id
                ))
            })?;
        if current.is_terminal {
            return Err(AppError::InvalidTransition(format!(
                "order {} is already {}",
                order.order_number, current.name
            )));
        }

        let target = order_statuses::find_by_id(&mut *tx, new_status_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("unknown order status id {new_status_id}"))
            })?;

        let now = db::now_millis();
        orders::update_status(&mut *tx, order_id, target.id, now).await?;
        orders::insert_history(&mut *tx, order_id, target.id, comment.as_deref(), now).await?;

        // Release the table only when no other order keeps it occupied; the
        // row just updated already counts as terminal inside this transaction.
        if target.is_terminal
            && let Some(table_id) = order.table_id
            && !TableService::has_active_orders(&mut *tx, table_id).await?
        {
            TableService::set_status(&mut *tx, table_id, TableStatus::Available).await?;
        }

        tx.commit().await?;
        self.cache.invalidate_order_mutation(order.table_id);

        let detail = self.get_order(order_id).await?;
        tracing::info!(
            order_number = %detail.order.order_number,
            status = %target.name,
            "Order status updated"
        );
        Ok(detail)
    }

    /// Order with its line items and full status history
    pub async fn get_order(&self, order_id: i64) -> AppResult<OrderDetail> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::find_by_id(&mut *conn, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order {order_id} not found")))?;
        let items = orders::items_for_order(&mut *conn, order_id).await?;
        let history = orders::history_for_order(&mut *conn, order_id).await?;
        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }

    /// Recent orders, newest first; the response is cached under
    /// `orders:list` and invalidated on every mutation.
    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        if let Some(cached) = self.cache.get(cache::ORDER_LIST_KEY)
            && let Ok(parsed) = serde_json::from_value(cached)
        {
            return Ok(parsed);
        }

        let mut conn = self.pool.acquire().await?;
        let list = orders::list_recent(&mut *conn, LIST_LIMIT).await?;

        match serde_json::to_value(&list) {
            Ok(value) => self.cache.put(cache::ORDER_LIST_KEY, value),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize order listing for cache"),
        }
        Ok(list)
    }
}

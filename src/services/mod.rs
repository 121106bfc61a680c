//! Business services
//!
//! The coordinator (`OrderService`) depends on the table state manager
//! (`TableService`) and the sequencer, never the other way around.

pub mod order_service;
pub mod table_service;

pub use order_service::{CreateOrderRequest, OrderDetail, OrderService};
pub use table_service::{TableService, TableWithOrders};

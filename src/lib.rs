//! comanda-server — café order/table consistency core
//!
//! The subsystem behind a café ordering platform that actually needs
//! coordination: date-scoped sequential order numbers under concurrent
//! creation, transactional order-status transitions with table-release side
//! effects, a self-healing table occupancy sweep, and a TTL-bounded read
//! cache invalidated on every mutation.
//!
//! HTTP routing, authentication and the surrounding CRUD live elsewhere;
//! this crate is invoked with already-validated inputs.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logger;
pub mod orders;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;

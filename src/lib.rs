//! Order reconciler - cancels orders whose payment invoices expired unpaid.
//!
//! Each invocation performs one reconciliation pass: it selects invoices that
//! expired without payment during the last seven days, sets the orders they
//! reference to `Cancelled`, and commits the batch atomically.
//!
//! # Features
//!
//! - `postgres` - PostgreSQL backend. Enabled by default.
//! - `sqlite` - SQLite backend. Enabled by default.
//!
//! # Example
//!
//! ```rust,ignore
//! use order_reconciler::handler;
//!
//! handler::run(serde_json::Value::Null, serde_json::Value::Null).await;
//! handler::shutdown().await;
//! ```

#[cfg(not(any(feature = "sqlite", feature = "postgres")))]
compile_error!("enable at least one database backend: the 'sqlite' or 'postgres' feature");

pub mod config;
pub mod errors;
pub mod handler;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod store;

//! Reconciliation jobs.
//!
//! Each job is a plain `run_*` async function that performs one pass against
//! a [`Database`](crate::store::Database) and reports what it did. Scheduling
//! is left to whatever invokes the process.
//!
//! # Available Jobs
//!
//! - **Expired Invoice Reconciliation**: Finds invoices that expired unpaid in
//!   the last seven days and sets their orders' status to 'Cancelled'
//!
//! # Usage
//!
//! ```rust,ignore
//! use chrono::Utc;
//! use order_reconciler::jobs::run_expired_invoice_reconciliation;
//! use order_reconciler::store::Database;
//!
//! let db = Database::new().await?;
//! let report = run_expired_invoice_reconciliation(&db, Utc::now()).await?;
//! ```

mod expired_invoices;

pub use expired_invoices::{
    referenced_order_pks, run_expired_invoice_reconciliation, transition_for, ExpiryWindow,
    ReconcileReport, Transition, CANCELLED_STATUS, LOOKBACK_DAYS, PROTECTED_STATUSES,
};

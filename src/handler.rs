//! Invocation entry point.
//!
//! The external trigger (cron, container scheduler, serverless runtime) calls
//! [`run`] once per tick. The connection pool is created on the first call and
//! reused by every later call in the same process; [`shutdown`] releases it.
//!
//! Failures never reach the trigger. They are logged with the run's id and
//! timestamp, and the invocation returns normally.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, Instrument};

use crate::errors::ReconcilerResult;
use crate::jobs::run_expired_invoice_reconciliation;
use crate::logging::{generate_run_id, run_span};
use crate::store::Database;

/// Process-wide pool, initialised on first use.
static DATABASE: OnceCell<Arc<Database>> = OnceCell::const_new();

/// Shared database handle, connecting from the global config on first call.
pub async fn database() -> ReconcilerResult<&'static Arc<Database>> {
    DATABASE.get_or_try_init(Database::new).await
}

/// Cancel orders whose invoices expired unpaid in the last seven days.
///
/// Returns the number of orders moved to 'Cancelled'. On failure the batch is
/// rolled back, the error is logged and 0 is returned.
pub async fn reconcile_expired_invoices(db: &Database) -> u32 {
    let run_at = Utc::now();
    let run_id = generate_run_id();

    async move {
        info!(backend = db.backend(), "Starting expired invoice reconciliation");

        match run_expired_invoice_reconciliation(db, run_at).await {
            Ok(report) => {
                info!(
                    invoices_matched = report.invoices_matched,
                    orders_selected = report.orders_selected,
                    already_cancelled = report.orders_already_cancelled,
                    protected = report.orders_protected,
                    "Processed {} orders",
                    report.orders_cancelled
                );
                report.orders_cancelled
            }
            Err(e) => {
                error!(
                    run_at = %run_at.to_rfc3339(),
                    error = %e,
                    "Error processing orders, transaction rolled back"
                );
                0
            }
        }
    }
    .instrument(run_span(&run_id, run_at))
    .await
}

/// Handle one trigger invocation.
///
/// `event` and `context` are whatever the trigger passes along; they are not
/// inspected.
pub async fn run(_event: Value, _context: Value) {
    let db = match database().await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Error initialising database, skipping run");
            return;
        }
    };

    reconcile_expired_invoices(db).await;
}

/// Close the shared pool, if one was opened.
pub async fn shutdown() {
    if let Some(db) = DATABASE.get() {
        info!("Closing database pool");
        db.close().await;
    }
}

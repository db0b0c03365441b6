//! Expired invoice reconciliation job.
//!
//! This job finds invoices whose payment window lapsed without payment during
//! the last [`LOOKBACK_DAYS`] days and moves the orders they reference to
//! 'Cancelled', committing the whole batch in a single transaction.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::errors::ReconcilerResult;
use crate::logging::{log_order_event, OrderEvent};
use crate::models::{Invoice, Order};
use crate::store::{Database, Session};

/// Status written onto orders whose invoice expired unpaid.
pub const CANCELLED_STATUS: &str = "Cancelled";

/// How far back an invoice's expiry may lie and still be reconciled.
pub const LOOKBACK_DAYS: i64 = 7;

/// Order statuses the job refuses to overwrite.
///
/// An invoice can expire after its order already shipped; cancelling a
/// delivered order would rewrite history, so such orders are left alone and
/// reported instead. Protected orders are therefore excluded from the set of
/// orders a pass updates, even when an expired unpaid invoice references them.
pub const PROTECTED_STATUSES: &[&str] = &["Delivered"];

/// Inclusive time range an invoice's `expired_at` must fall in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ExpiryWindow {
    /// The lookback window closing at `now`.
    pub fn ending_at(now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(LOOKBACK_DAYS),
            end: now,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

/// What the job does with one selected order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Write 'Cancelled'.
    Cancel,
    /// Already 'Cancelled'; writing again would change nothing.
    AlreadyCancelled,
    /// Status is in [`PROTECTED_STATUSES`].
    Protected,
}

/// Decide the transition for an order based on its current status.
pub fn transition_for(order: &Order) -> Transition {
    if order.is_cancelled() {
        Transition::AlreadyCancelled
    } else if PROTECTED_STATUSES.contains(&order.status.as_str()) {
        Transition::Protected
    } else {
        Transition::Cancel
    }
}

/// Distinct order references among `invoices`. Invoices without an order are ignored.
pub fn referenced_order_pks(invoices: &[Invoice]) -> BTreeSet<i32> {
    invoices.iter().filter_map(|invoice| invoice.order_pk).collect()
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    pub run_at: DateTime<Utc>,
    pub window: ExpiryWindow,
    /// Invoices matching the expiry predicate.
    pub invoices_matched: usize,
    /// Orders referenced by those invoices.
    pub orders_selected: usize,
    pub orders_cancelled: u32,
    pub orders_already_cancelled: u32,
    pub orders_protected: u32,
}

/// Run one reconciliation pass as of `now`.
///
/// Queries for invoices where:
/// - `payment_paid_at IS NULL`
/// - `expired_at` within `[now - 7 days, now]`
///
/// Updates every order they reference:
/// - Sets `status = 'Cancelled'`, unless already cancelled or protected
///
/// Everything happens in one transaction. Any failure rolls the whole batch
/// back and is returned to the caller.
pub async fn run_expired_invoice_reconciliation(
    db: &Database,
    now: DateTime<Utc>,
) -> ReconcilerResult<ReconcileReport> {
    let window = ExpiryWindow::ending_at(now);

    debug!(
        "Checking for invoices expired between {} and {}",
        window.start, window.end
    );

    let mut session = db.begin().await?;

    match cancel_orders(&mut session, now, window).await {
        Ok(report) => {
            session.commit().await?;
            Ok(report)
        }
        Err(e) => {
            if let Err(rollback_err) = session.rollback().await {
                warn!("Rollback after failed reconciliation also failed: {rollback_err}");
            }
            Err(e)
        }
    }
}

/// Stage the status updates for one pass inside `session`.
async fn cancel_orders(
    session: &mut Session,
    now: DateTime<Utc>,
    window: ExpiryWindow,
) -> ReconcilerResult<ReconcileReport> {
    let invoices = session.find_expired_unpaid_invoices(&window).await?;
    for invoice in &invoices {
        debug!(
            "Invoice {} expired at {:?} (order pk {:?})",
            invoice.id, invoice.expired_at, invoice.order_pk
        );
    }

    let order_pks = referenced_order_pks(&invoices);
    let orders = session.find_orders_by_pks(&order_pks).await?;

    debug!(
        "{} expired unpaid invoices reference {} orders",
        invoices.len(),
        orders.len()
    );

    let mut report = ReconcileReport {
        run_at: now,
        window,
        invoices_matched: invoices.len(),
        orders_selected: orders.len(),
        orders_cancelled: 0,
        orders_already_cancelled: 0,
        orders_protected: 0,
    };

    for order in &orders {
        log_order_event(OrderEvent::Processing, &order.order_id, None);

        match transition_for(order) {
            Transition::Cancel => {
                session.set_order_status(order, CANCELLED_STATUS).await?;
                report.orders_cancelled += 1;
                log_order_event(
                    OrderEvent::Cancelled,
                    &order.order_id,
                    Some(format!("from {}", order.status).as_str()),
                );
            }
            Transition::AlreadyCancelled => {
                report.orders_already_cancelled += 1;
                log_order_event(OrderEvent::AlreadyCancelled, &order.order_id, None);
            }
            Transition::Protected => {
                report.orders_protected += 1;
                log_order_event(
                    OrderEvent::Protected,
                    &order.order_id,
                    Some(order.status.as_str()),
                );
            }
        }
    }

    Ok(report)
}

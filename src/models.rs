//! Plain records read from the order/payment schema.
//!
//! These carry only the columns the reconciler needs. Amounts, provider
//! metadata, customer details and the rest of both tables are never selected
//! or written, so they pass through untouched.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Row of `payments_invoice`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    /// `payments_invoice.order_id`, a foreign key to `core_order.id`.
    pub order_pk: Option<i32>,
    pub expired_at: Option<DateTime<Utc>>,
    /// `payments_invoice.payment_paid_at`; `None` means unpaid.
    pub paid_at: Option<DateTime<Utc>>,
}

/// Row of `core_order`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Order {
    /// Internal primary key.
    pub id: i32,
    /// Business identifier, e.g. `ORD001`.
    pub order_id: String,
    pub status: String,
}

impl Order {
    pub fn is_cancelled(&self) -> bool {
        self.status == crate::jobs::CANCELLED_STATUS
    }
}

//! Per-invocation session over one open transaction.
//!
//! A [`Session`] owns a pooled connection for the lifetime of a single
//! reconciliation pass. It ends through [`Session::commit`] or
//! [`Session::rollback`]; if it is dropped on any other path, sqlx rolls the
//! transaction back and returns the connection to the pool.

use std::collections::BTreeSet;

use sqlx::{query, query_as, Transaction};
use tracing::error;

#[cfg(feature = "sqlite")]
use sqlx::{QueryBuilder, Sqlite};

#[cfg(feature = "postgres")]
use sqlx::Postgres;

use crate::errors::{ReconcilerError, ReconcilerResult};
use crate::jobs::ExpiryWindow;
use crate::models::{Invoice, Order};

/// Columns read from `payments_invoice`, renamed onto [`Invoice`].
const INVOICE_COLUMNS: &str =
    "id, order_id AS order_pk, expired_at, payment_paid_at AS paid_at";

/// Columns read from `core_order`.
const ORDER_COLUMNS: &str = "id, order_id, status";

/// An open transaction on one of the supported backends.
pub enum Session {
    #[cfg(feature = "sqlite")]
    SQLite(Transaction<'static, Sqlite>),
    #[cfg(feature = "postgres")]
    Postgres(Transaction<'static, Postgres>),
}

impl Session {
    /// Fetch unpaid invoices whose expiry falls inside `window`.
    ///
    /// All three conditions are ANDed over the whole filter:
    /// `payment_paid_at IS NULL AND expired_at >= start AND expired_at <= end`.
    /// Invoices with no `expired_at` never match.
    ///
    /// SQLite stores timestamps as text in whatever format the writer chose
    /// (`T` or space separator, with or without offset), so both sides are
    /// compared as `julianday` instants rather than strings.
    pub async fn find_expired_unpaid_invoices(
        &mut self,
        window: &ExpiryWindow,
    ) -> ReconcilerResult<Vec<Invoice>> {
        let invoices = match self {
            #[cfg(feature = "sqlite")]
            Session::SQLite(tx) => query_as::<_, Invoice>(&format!(
                "SELECT {INVOICE_COLUMNS} FROM payments_invoice \
                 WHERE payment_paid_at IS NULL \
                   AND julianday(expired_at) >= julianday(?) \
                   AND julianday(expired_at) <= julianday(?) \
                 ORDER BY julianday(expired_at)"
            ))
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| {
                error!("SQLite find_expired_unpaid_invoices failed: {e}");
                ReconcilerError::DatabaseError(format!("database error: {e}"))
            })?,
            #[cfg(feature = "postgres")]
            Session::Postgres(tx) => query_as::<_, Invoice>(&format!(
                "SELECT {INVOICE_COLUMNS} FROM payments_invoice \
                 WHERE payment_paid_at IS NULL \
                   AND expired_at >= $1 \
                   AND expired_at <= $2 \
                 ORDER BY expired_at"
            ))
            .bind(window.start)
            .bind(window.end)
            .fetch_all(&mut **tx)
            .await
            .map_err(|e| {
                error!("Postgres find_expired_unpaid_invoices failed: {e}");
                ReconcilerError::DatabaseError(format!("database error: {e}"))
            })?,
        };

        Ok(invoices)
    }

    /// Fetch the orders whose primary key is in `pks`, ordered by key.
    ///
    /// An empty set returns no orders without touching the database.
    pub async fn find_orders_by_pks(&mut self, pks: &BTreeSet<i32>) -> ReconcilerResult<Vec<Order>> {
        if pks.is_empty() {
            return Ok(Vec::new());
        }

        let orders = match self {
            #[cfg(feature = "sqlite")]
            Session::SQLite(tx) => {
                let mut builder = QueryBuilder::<Sqlite>::new(format!(
                    "SELECT {ORDER_COLUMNS} FROM core_order WHERE id IN ("
                ));
                let mut ids = builder.separated(", ");
                for pk in pks {
                    ids.push_bind(*pk);
                }
                ids.push_unseparated(") ORDER BY id");

                builder
                    .build_query_as::<Order>()
                    .fetch_all(&mut **tx)
                    .await
                    .map_err(|e| {
                        error!("SQLite find_orders_by_pks failed: {e}");
                        ReconcilerError::DatabaseError(format!("database error: {e}"))
                    })?
            }
            #[cfg(feature = "postgres")]
            Session::Postgres(tx) => {
                let ids: Vec<i32> = pks.iter().copied().collect();

                query_as::<_, Order>(&format!(
                    "SELECT {ORDER_COLUMNS} FROM core_order WHERE id = ANY($1) ORDER BY id"
                ))
                .bind(ids)
                .fetch_all(&mut **tx)
                .await
                .map_err(|e| {
                    error!("Postgres find_orders_by_pks failed: {e}");
                    ReconcilerError::DatabaseError(format!("database error: {e}"))
                })?
            }
        };

        Ok(orders)
    }

    /// Write `status` onto `order`. No other column is touched.
    ///
    /// Returns `ReconcilerError::OrderVanished` if the row no longer exists.
    pub async fn set_order_status(&mut self, order: &Order, status: &str) -> ReconcilerResult<()> {
        let rows_affected = match self {
            #[cfg(feature = "sqlite")]
            Session::SQLite(tx) => query("UPDATE core_order SET status = ? WHERE id = ?")
                .bind(status)
                .bind(order.id)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    error!("SQLite set_order_status failed: {e}");
                    ReconcilerError::DatabaseError(format!("database error: {e}"))
                })?
                .rows_affected(),
            #[cfg(feature = "postgres")]
            Session::Postgres(tx) => query("UPDATE core_order SET status = $1 WHERE id = $2")
                .bind(status)
                .bind(order.id)
                .execute(&mut **tx)
                .await
                .map_err(|e| {
                    error!("Postgres set_order_status failed: {e}");
                    ReconcilerError::DatabaseError(format!("database error: {e}"))
                })?
                .rows_affected(),
        };

        if rows_affected == 0 {
            return Err(ReconcilerError::OrderVanished {
                order_pk: order.id,
                order_id: order.order_id.clone(),
            });
        }

        Ok(())
    }

    /// Commit every staged update as one unit.
    ///
    /// On failure the transaction is dropped, which rolls it back.
    pub async fn commit(self) -> ReconcilerResult<()> {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Session::SQLite(tx) => tx.commit().await,
            #[cfg(feature = "postgres")]
            Session::Postgres(tx) => tx.commit().await,
        };

        result.map_err(|e| {
            error!("Commit failed: {e}");
            ReconcilerError::DatabaseError(format!("commit failed: {e}"))
        })
    }

    /// Discard every staged update.
    pub async fn rollback(self) -> ReconcilerResult<()> {
        let result = match self {
            #[cfg(feature = "sqlite")]
            Session::SQLite(tx) => tx.rollback().await,
            #[cfg(feature = "postgres")]
            Session::Postgres(tx) => tx.rollback().await,
        };

        result.map_err(|e| ReconcilerError::DatabaseError(format!("rollback failed: {e}")))
    }
}

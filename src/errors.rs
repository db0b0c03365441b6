//! Error types for the order reconciler.

use thiserror::Error;

/// Errors raised while configuring or running a reconciliation pass.
///
/// None of these escape the invocation entry point; `handler::run` logs and
/// swallows them so the trigger always sees a handled invocation.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Configuration could not be loaded or failed validation.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Connection, query, or commit failure reported by the store.
    #[error("database error: {0}")]
    DatabaseError(String),

    /// An order selected in this transaction matched no rows on update.
    #[error("order {order_id} (pk {order_pk}) disappeared mid-transaction")]
    OrderVanished { order_pk: i32, order_id: String },

    /// The connection string names a backend this build does not support.
    #[error("unsupported database: {0}")]
    UnsupportedDatabase(String),
}

pub type ReconcilerResult<T> = Result<T, ReconcilerError>;

impl From<sqlx::Error> for ReconcilerError {
    fn from(err: sqlx::Error) -> Self {
        ReconcilerError::DatabaseError(err.to_string())
    }
}

impl From<config::ConfigError> for ReconcilerError {
    fn from(err: config::ConfigError) -> Self {
        ReconcilerError::ConfigError(err.to_string())
    }
}

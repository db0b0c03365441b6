use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::ConnectOptions;
use tracing::{error, info};

#[cfg(feature = "sqlite")]
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

#[cfg(feature = "postgres")]
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::config::{get_config, DatabaseConfig};
use crate::errors::{ReconcilerError, ReconcilerResult};
use crate::store::session::Session;

/// Unified connection pool over SQLite and Postgres.
///
/// Available variants depend on enabled features:
/// - `sqlite` feature enables `Database::SQLite`
/// - `postgres` feature enables `Database::Postgres`
///
/// One pool is created per process and shared by every invocation. Each
/// invocation borrows a single connection through [`Database::begin`].
#[derive(Debug, Clone)]
pub enum Database {
    #[cfg(feature = "sqlite")]
    SQLite(SqlitePool),
    #[cfg(feature = "postgres")]
    Postgres(PgPool),
}

/// Apply the configured statement logging to a backend's connect options.
fn with_statement_logging<O: ConnectOptions>(options: O, enabled: bool) -> O {
    if enabled {
        options.log_statements(log::LevelFilter::Info)
    } else {
        options.disable_statement_logging()
    }
}

impl Database {
    /// Initialize the database connection from the global configuration.
    ///
    /// See `crate::config` for configuration options.
    pub async fn new() -> ReconcilerResult<Arc<Self>> {
        let config = get_config()?;
        Ok(Arc::new(Self::connect(&config.database).await?))
    }

    /// Open a pool for the given database configuration.
    ///
    /// The backend is chosen from the URL scheme.
    pub async fn connect(db_config: &DatabaseConfig) -> ReconcilerResult<Self> {
        let acquire_timeout = Duration::from_secs(db_config.acquire_timeout_secs);

        match db_config.backend() {
            #[cfg(feature = "sqlite")]
            Some("sqlite") => {
                let options = SqliteConnectOptions::from_str(&db_config.url).map_err(|e| {
                    ReconcilerError::ConfigError(format!("invalid SQLite URL: {e}"))
                })?;

                let pool = SqlitePoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect_with(with_statement_logging(options, db_config.log_statements))
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to SQLite: {e}");
                        ReconcilerError::DatabaseError(format!("failed to connect to SQLite: {e}"))
                    })?;

                info!(backend = "sqlite", "Database pool ready");
                Ok(Database::SQLite(pool))
            }
            #[cfg(feature = "postgres")]
            Some("postgres") => {
                let options = PgConnectOptions::from_str(&db_config.url).map_err(|e| {
                    ReconcilerError::ConfigError(format!("invalid PostgreSQL URL: {e}"))
                })?;

                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(acquire_timeout)
                    .connect_with(with_statement_logging(options, db_config.log_statements))
                    .await
                    .map_err(|e| {
                        error!("Failed to connect to PostgreSQL: {e}");
                        ReconcilerError::DatabaseError(format!(
                            "failed to connect to PostgreSQL: {e}"
                        ))
                    })?;

                info!(
                    backend = "postgres",
                    host = %db_config.redacted_host(),
                    "Database pool ready"
                );
                Ok(Database::Postgres(pool))
            }
            Some(other) => Err(ReconcilerError::UnsupportedDatabase(format!(
                "{other} support not compiled in. Enable the '{other}' feature."
            ))),
            None => Err(ReconcilerError::UnsupportedDatabase(
                "connection string must start with sqlite: or postgres://".to_string(),
            )),
        }
    }

    /// Backend name, as used in logs.
    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(_) => "sqlite",
            #[cfg(feature = "postgres")]
            Database::Postgres(_) => "postgres",
        }
    }

    /// Start the transaction that scopes one reconciliation pass.
    pub async fn begin(&self) -> ReconcilerResult<Session> {
        let session = match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => Session::SQLite(pool.begin().await.map_err(|e| {
                error!("SQLite begin failed: {e}");
                ReconcilerError::DatabaseError(format!("failed to begin transaction: {e}"))
            })?),
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => Session::Postgres(pool.begin().await.map_err(|e| {
                error!("Postgres begin failed: {e}");
                ReconcilerError::DatabaseError(format!("failed to begin transaction: {e}"))
            })?),
        };

        Ok(session)
    }

    /// Close every pooled connection. Used at process shutdown.
    pub async fn close(&self) {
        match self {
            #[cfg(feature = "sqlite")]
            Database::SQLite(pool) => pool.close().await,
            #[cfg(feature = "postgres")]
            Database::Postgres(pool) => pool.close().await,
        }
    }
}

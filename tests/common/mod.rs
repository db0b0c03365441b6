//! Shared fixtures for the SQLite-backed integration tests.

#![allow(dead_code)]

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use order_reconciler::config::DatabaseConfig;
use order_reconciler::store::Database;

/// Current time truncated to whole seconds, so stored and bound timestamps compare exactly.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Open a single-connection in-memory database without any tables.
pub async fn empty_test_db() -> Database {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        ..DatabaseConfig::default()
    };

    Database::connect(&config)
        .await
        .expect("failed to create database")
}

/// Open an in-memory database with the order and invoice tables.
pub async fn setup_test_db() -> Database {
    let db = empty_test_db().await;
    let pool = sqlite_pool(&db);

    sqlx::query(
        r#"
        CREATE TABLE core_order (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            order_id TEXT NOT NULL UNIQUE,
            customer_email TEXT NOT NULL DEFAULT 'buyer@example.com',
            total_price TEXT NOT NULL DEFAULT '100.00',
            currency TEXT NOT NULL DEFAULT 'PHP',
            remarks TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .expect("failed to create core_order table");

    sqlx::query(
        r#"
        CREATE TABLE payments_invoice (
            id BLOB PRIMARY KEY,
            order_id INTEGER REFERENCES core_order(id),
            status TEXT NOT NULL,
            total_invoice_amount TEXT NOT NULL DEFAULT '100.00',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            payment_paid_at TEXT,
            expired_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .expect("failed to create payments_invoice table");

    db
}

pub fn sqlite_pool(db: &Database) -> &SqlitePool {
    match db {
        Database::SQLite(pool) => pool,
        #[allow(unreachable_patterns)]
        _ => panic!("integration tests run against SQLite"),
    }
}

/// Insert an order and return its primary key.
pub async fn insert_order(db: &Database, order_id: &str, status: &str) -> i32 {
    let created = now() - chrono::Duration::days(30);

    let result = sqlx::query(
        "INSERT INTO core_order (created_at, updated_at, order_id, status) VALUES (?, ?, ?, ?)",
    )
    .bind(created)
    .bind(created)
    .bind(order_id)
    .bind(status)
    .execute(sqlite_pool(db))
    .await
    .expect("failed to insert order");

    result.last_insert_rowid() as i32
}

/// Insert an invoice for `order_pk`.
pub async fn insert_invoice(
    db: &Database,
    order_pk: Option<i32>,
    expired_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
) -> Uuid {
    let id = Uuid::new_v4();
    let created = now() - chrono::Duration::days(30);
    let status = if paid_at.is_some() { "PAID" } else { "PENDING" };

    sqlx::query(
        r#"
        INSERT INTO payments_invoice
            (id, order_id, status, created_at, updated_at, payment_paid_at, expired_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(order_pk)
    .bind(status)
    .bind(created)
    .bind(created)
    .bind(paid_at)
    .bind(expired_at)
    .execute(sqlite_pool(db))
    .await
    .expect("failed to insert invoice");

    id
}

pub async fn order_status(db: &Database, order_id: &str) -> String {
    sqlx::query_scalar::<_, String>("SELECT status FROM core_order WHERE order_id = ?")
        .bind(order_id)
        .fetch_one(sqlite_pool(db))
        .await
        .expect("order not found")
}

pub async fn order_updated_at(db: &Database, order_id: &str) -> DateTime<Utc> {
    sqlx::query_scalar::<_, DateTime<Utc>>("SELECT updated_at FROM core_order WHERE order_id = ?")
        .bind(order_id)
        .fetch_one(sqlite_pool(db))
        .await
        .expect("order not found")
}

/// Business ids of every order currently cancelled, sorted.
pub async fn cancelled_orders(db: &Database) -> Vec<String> {
    sqlx::query_scalar::<_, String>(
        "SELECT order_id FROM core_order WHERE status = 'Cancelled' ORDER BY order_id",
    )
    .fetch_all(sqlite_pool(db))
    .await
    .expect("failed to list cancelled orders")
}

/// Insert an unpaid invoice whose `expired_at` is stored verbatim as `expired_at_text`.
///
/// Lets tests store timestamps in formats other writers of the schema use.
pub async fn insert_invoice_with_raw_expiry(
    db: &Database,
    order_pk: i32,
    expired_at_text: &str,
) -> Uuid {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO payments_invoice
            (id, order_id, status, created_at, updated_at, expired_at)
        VALUES (?, ?, 'PENDING', datetime('now'), datetime('now'), ?)
        "#,
    )
    .bind(id)
    .bind(order_pk)
    .bind(expired_at_text)
    .execute(sqlite_pool(db))
    .await
    .expect("failed to insert invoice");

    id
}

// src/store/mod.rs

//! Storage layer for the reconciler.
//!
//! This module contains:
//! - `database` → connection pool over SQLite/Postgres, created once per process
//! - `session`  → one transaction per invocation, plus the reconciler's queries

pub mod database;
pub mod session;

pub use database::Database;
pub use session::Session;

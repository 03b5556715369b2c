//! Shared helpers for integration tests.
#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Initializes test logging; safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Creates a single-connection in-memory SQLite pool.
pub async fn create_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Returns the number of columns the table currently has.
pub async fn column_count(pool: &SqlitePool, table: &str) -> usize {
    sqlx::query(&format!("PRAGMA table_info(\"{table}\")"))
        .fetch_all(pool)
        .await
        .expect("Failed to read table info")
        .len()
}

/// Returns whether an index with the given name exists.
pub async fn index_exists(pool: &SqlitePool, name: &str) -> bool {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("Failed to query sqlite_master");
    count > 0
}

/// Returns whether a table with the given name exists.
pub async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?")
            .bind(name)
            .fetch_one(pool)
            .await
            .expect("Failed to query sqlite_master");
    count > 0
}

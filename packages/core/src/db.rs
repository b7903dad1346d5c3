//! SQLite pool construction and schema setup.
//!
//! [`create_pool`] creates the database file when missing and applies the
//! schema idempotently, so the binary and the tests share one entry point.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS history_entries (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        run_date TEXT NOT NULL,
        community TEXT NOT NULL,
        total_posts INTEGER NOT NULL,
        unanswered INTEGER NOT NULL,
        unanswered_rate REAL NOT NULL,
        median_latency_minutes REAL
    )",
    "CREATE INDEX IF NOT EXISTS idx_history_community_date
        ON history_entries (community, run_date)",
    "CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        community TEXT NOT NULL,
        generated_at TEXT NOT NULL,
        body TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_reports_community
        ON reports (community, generated_at)",
];

/// Open (or create) the database at `database_url` and apply the schema.
///
/// In-memory databases are limited to a single connection because every
/// SQLite connection to `:memory:` opens a separate database.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    tracing::debug!("Database ready at {}", database_url);
    Ok(pool)
}

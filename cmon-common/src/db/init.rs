//! Database initialization
//!
//! Opens (or creates) the machine store and brings its schema up to date:
//! tables first, then column synchronization for stores created by older releases,
//! then indexes (which may reference synchronized columns).

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Pragmas set here apply to every pooled connection, not just the first one
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create missing tables, add missing columns, create indexes
///
/// Idempotent; safe on every startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_machines_table(pool).await?;
    create_tools_table(pool).await?;
    create_measurements_table(pool).await?;

    crate::db::table_schemas::sync_all_table_schemas(pool).await?;

    create_indexes(pool).await?;

    Ok(())
}

async fn create_machines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS machines (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            hac_code TEXT,
            notes TEXT NOT NULL DEFAULT '',
            priority INTEGER NOT NULL DEFAULT 1 CHECK (priority BETWEEN 1 AND 5),
            machine_group INTEGER NOT NULL DEFAULT 1 CHECK (machine_group BETWEEN 1 AND 5),
            color TEXT,
            color_hex TEXT,
            machine_type TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_tools_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tools (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_measurements_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS measurements (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            machine_id INTEGER NOT NULL REFERENCES machines(id) ON DELETE CASCADE,
            tool_id INTEGER NOT NULL REFERENCES tools(id),
            date TEXT NOT NULL,
            criticality INTEGER CHECK (criticality BETWEEN 0 AND 10),
            note TEXT,
            severity TEXT,
            repair_time TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_machines_hac_code ON machines(hac_code)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_measurements_machine ON measurements(machine_id)")
        .execute(pool)
        .await?;

    Ok(())
}

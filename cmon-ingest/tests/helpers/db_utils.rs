//! Database Test Utilities

use anyhow::Result;
use cmon_common::db::{init_database, Machine, Measurement};
use cmon_ingest::db::{machines, measurements};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Create a file-backed test store with the full schema
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_machines.db");
    let pool = init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Machine whose HAC code equals `code` exactly
pub async fn machine_by_code(pool: &SqlitePool, code: &str) -> Option<Machine> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM machines WHERE hac_code = ?")
        .bind(code)
        .fetch_optional(pool)
        .await
        .unwrap();
    let id = id?;

    let mut conn = pool.acquire().await.unwrap();
    machines::load_machine(&mut *conn, id).await.unwrap()
}

pub async fn machine_count(pool: &SqlitePool) -> i64 {
    machines::count_machines(pool).await.unwrap()
}

pub async fn measurements_of(pool: &SqlitePool, machine_id: i64) -> Vec<Measurement> {
    measurements::load_measurements_for_machine(pool, machine_id)
        .await
        .unwrap()
}

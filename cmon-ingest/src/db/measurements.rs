//! Measurement writes and reads

use cmon_common::db::{clamp_criticality, Measurement};
use cmon_common::Result;
use sqlx::{Row, SqliteConnection, SqlitePool};

/// Measurement recorded by the import
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeasurement {
    pub machine_id: i64,
    pub tool_id: i64,
    /// `YYYY-MM-DD HH:MM`, local time
    pub date: String,
    pub criticality: i64,
    pub note: String,
}

/// Append a measurement, returning its id
pub async fn insert_measurement(conn: &mut SqliteConnection, measurement: &NewMeasurement) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO measurements (machine_id, tool_id, date, criticality, note) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(measurement.machine_id)
    .bind(measurement.tool_id)
    .bind(&measurement.date)
    .bind(clamp_criticality(measurement.criticality))
    .bind(&measurement.note)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Measurements of one machine, oldest first
pub async fn load_measurements_for_machine(pool: &SqlitePool, machine_id: i64) -> Result<Vec<Measurement>> {
    let rows = sqlx::query(
        r#"
        SELECT id, machine_id, tool_id, date, criticality, note, severity, repair_time
        FROM measurements
        WHERE machine_id = ?
        ORDER BY id
        "#,
    )
    .bind(machine_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| Measurement {
            id: row.get("id"),
            machine_id: row.get("machine_id"),
            tool_id: row.get("tool_id"),
            date: row.get("date"),
            criticality: row.get("criticality"),
            note: row.get("note"),
            severity: row.get("severity"),
            repair_time: row.get("repair_time"),
        })
        .collect())
}

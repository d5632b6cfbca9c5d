//! Merges scored rows into the machine store
//!
//! Machine identity is resolved in order:
//! 1. code given: machine whose `hac_code` equals it or whose name contains it
//! 2. otherwise, or no hit: machine with exactly the row's name
//! 3. otherwise: a new machine
//!
//! Every reconciled row then gets one new AutoImport measurement. Re-importing the same
//! workbook never duplicates machines but always adds measurements.

use chrono::Local;
use cmon_common::db::{Machine, AUTO_IMPORT_TOOL, AUTO_IMPORT_TOOL_DESCRIPTION};
use sqlx::SqliteConnection;
use thiserror::Error;
use tracing::debug;

use crate::db::machines::{self, MachineUpdate, NewMachine};
use crate::db::measurements::{self, NewMeasurement};
use crate::db::tools;
use crate::pipeline::ScoredRow;

/// Measurement timestamp format
pub const MEASUREMENT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Row-scoped reconciliation failures; the import skips the row and continues
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Row had neither name nor code
    #[error("Row has neither name nor code")]
    Unidentifiable,

    /// Machine lookup, insert or update failed
    #[error("Machine write failed for '{label}': {source}")]
    MachineWrite {
        label: String,
        #[source]
        source: cmon_common::Error,
    },

    /// Measurement insert failed
    #[error("Measurement insert failed for machine {machine_id}: {source}")]
    MeasurementInsert {
        machine_id: i64,
        #[source]
        source: cmon_common::Error,
    },
}

/// Result of reconciling one row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciled {
    pub machine_id: i64,
    pub measurement_id: i64,
    /// `true` when the machine did not exist before
    pub created: bool,
}

/// Upserts scored rows; bound to the AutoImport tool
#[derive(Debug, Clone)]
pub struct Reconciler {
    tool_id: i64,
}

impl Reconciler {
    /// Resolve (or create) the AutoImport tool
    pub async fn prepare(conn: &mut SqliteConnection) -> cmon_common::Result<Self> {
        let tool_id = tools::ensure_tool(conn, AUTO_IMPORT_TOOL, AUTO_IMPORT_TOOL_DESCRIPTION).await?;
        Ok(Self { tool_id })
    }

    /// Upsert the machine and append its measurement
    pub async fn reconcile(&self, conn: &mut SqliteConnection, row: &ScoredRow) -> Result<Reconciled, ReconcileError> {
        let (machine_id, created) = self.upsert(conn, row).await?;
        let measurement_id = self.record_measurement(conn, machine_id, row).await?;

        Ok(Reconciled {
            machine_id,
            measurement_id,
            created,
        })
    }

    /// Match or create the machine for `row`; returns `(machine_id, created)`
    pub async fn upsert(&self, conn: &mut SqliteConnection, row: &ScoredRow) -> Result<(i64, bool), ReconcileError> {
        let machine_error = |source| ReconcileError::MachineWrite {
            label: row.label().to_string(),
            source,
        };

        match find_existing(conn, row).await.map_err(machine_error)? {
            Some(existing) => {
                let update = MachineUpdate {
                    priority: row.priority,
                    notes: machines::merge_notes(&existing.notes, &row.notes),
                    color: row.color.color,
                    color_hex: row.color.hex.clone(),
                    machine_type: row.machine_type.clone(),
                    hac_code: row.code.clone(),
                };
                machines::update_machine(conn, existing.id, &update)
                    .await
                    .map_err(machine_error)?;

                debug!("Updated machine {} ('{}') from row '{}'", existing.id, existing.name, row.label());
                Ok((existing.id, false))
            }
            None => {
                let name = row
                    .name
                    .clone()
                    .or_else(|| row.code.clone())
                    .ok_or(ReconcileError::Unidentifiable)?;
                let machine = NewMachine {
                    name,
                    hac_code: row.code.clone(),
                    notes: row.notes.clone(),
                    priority: row.priority,
                    color: row.color.color,
                    color_hex: row.color.hex.clone(),
                    machine_type: row.machine_type.clone(),
                };
                let id = machines::insert_machine(conn, &machine)
                    .await
                    .map_err(machine_error)?;

                debug!("Created machine {} ('{}')", id, machine.name);
                Ok((id, true))
            }
        }
    }

    /// Append the AutoImport measurement for `machine_id`
    pub async fn record_measurement(
        &self,
        conn: &mut SqliteConnection,
        machine_id: i64,
        row: &ScoredRow,
    ) -> Result<i64, ReconcileError> {
        let measurement = NewMeasurement {
            machine_id,
            tool_id: self.tool_id,
            date: Local::now().format(MEASUREMENT_DATE_FORMAT).to_string(),
            criticality: row.criticality,
            note: row.match_note(),
        };

        measurements::insert_measurement(conn, &measurement)
            .await
            .map_err(|source| ReconcileError::MeasurementInsert { machine_id, source })
    }
}

async fn find_existing(conn: &mut SqliteConnection, row: &ScoredRow) -> cmon_common::Result<Option<Machine>> {
    if let Some(code) = row.code.as_deref() {
        if let Some(machine) = machines::find_by_code(conn, code).await? {
            return Ok(Some(machine));
        }
    }

    match row.name.as_deref() {
        Some(name) => machines::find_by_name(conn, name).await,
        None => Ok(None),
    }
}

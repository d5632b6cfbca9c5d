//! Workbook import
//!
//! One run: load the workbook on a blocking thread, locate the header, build the rulebook,
//! then score and reconcile every data row inside a single transaction. Rows that cannot be
//! written are logged and skipped; the transaction commits once at the end and is rolled
//! back on any early return.

use cmon_common::config::TomlConfig;
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::reconciler::Reconciler;
use crate::pipeline::{criteria, header, ColumnRoles, CriteriaMap, RowPipeline};
use crate::workbook::{Sheet, Workbook, WorkbookError};

/// Failures that abort an import before commit
#[derive(Debug, Error)]
pub enum ImportError {
    /// Workbook file does not exist
    #[error("Workbook not found: {}", .0.display())]
    WorkbookNotFound(PathBuf),

    /// Workbook or its main sheet could not be read
    #[error("Error reading main sheet '{sheet}': {source}")]
    MainSheet {
        sheet: String,
        #[source]
        source: WorkbookError,
    },

    /// Store unavailable (begin, tool setup or commit)
    #[error("Store error: {0}")]
    Store(#[from] cmon_common::Error),

    /// Blocking workbook loader panicked or was cancelled
    #[error("Workbook loader failed: {0}")]
    Loader(#[from] tokio::task::JoinError),
}

impl From<sqlx::Error> for ImportError {
    fn from(e: sqlx::Error) -> Self {
        ImportError::Store(e.into())
    }
}

/// Outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows whose measurement was inserted
    pub measurements_created: usize,
    pub machines_created: usize,
    pub machines_updated: usize,
    /// Rows without name or code (including blank rows)
    pub rows_skipped: usize,
    /// Rows whose machine or measurement write failed
    pub rows_failed: usize,
    /// Zero-based header row of the main sheet
    pub header_row: usize,
    pub criteria_rules: usize,
}

impl ImportSummary {
    /// Result line reported to the caller
    pub fn message(&self) -> String {
        format!("Import completed. {} measurements created.", self.measurements_created)
    }
}

/// Main sheet and rulebook, read off the async runtime
struct LoadedWorkbook {
    main: Sheet,
    header_row: usize,
    criteria: CriteriaMap,
}

fn load_workbook(path: &Path, config: &TomlConfig) -> Result<LoadedWorkbook, ImportError> {
    let main_sheet = &config.workbook.main_sheet;
    let main_error = |source| ImportError::MainSheet {
        sheet: main_sheet.clone(),
        source,
    };

    let mut workbook = match Workbook::open(path) {
        Ok(workbook) => workbook,
        Err(WorkbookError::NotFound(path)) => return Err(ImportError::WorkbookNotFound(path)),
        Err(e) => return Err(main_error(e)),
    };

    let main = workbook.sheet(main_sheet).map_err(main_error)?;
    let header_row = header::locate(&main, config.workbook.header_max_scan);

    let criteria_sheet = &config.workbook.criteria_sheet;
    let criteria = if workbook.has_sheet(criteria_sheet) {
        match workbook.sheet(criteria_sheet) {
            Ok(sheet) => criteria::extract(&sheet),
            Err(e) => {
                warn!("Criteria sheet unreadable, scoring without rules: {}", e);
                CriteriaMap::new()
            }
        }
    } else {
        warn!("Criteria sheet '{}' not found, scoring without rules", criteria_sheet);
        CriteriaMap::new()
    };

    Ok(LoadedWorkbook {
        main,
        header_row,
        criteria,
    })
}

/// Runs workbook imports against one store
#[derive(Clone)]
pub struct ImportOrchestrator {
    db: SqlitePool,
    config: TomlConfig,
}

impl ImportOrchestrator {
    pub fn new(db: SqlitePool, config: TomlConfig) -> Self {
        Self { db, config }
    }

    /// Import `workbook_path`
    pub async fn run(&self, workbook_path: &Path) -> Result<ImportSummary, ImportError> {
        if !workbook_path.exists() {
            return Err(ImportError::WorkbookNotFound(workbook_path.to_path_buf()));
        }

        info!("Importing workbook {}", workbook_path.display());

        let path = workbook_path.to_path_buf();
        let config = self.config.clone();
        let loaded = tokio::task::spawn_blocking(move || load_workbook(&path, &config)).await??;

        let LoadedWorkbook {
            main,
            header_row,
            criteria,
        } = loaded;

        let roles = ColumnRoles::recognize(main.row(header_row).unwrap_or_default());
        info!(
            "Header at row {}, {} criteria rules, {} data rows",
            header_row + 1,
            criteria.len(),
            main.height().saturating_sub(header_row + 1)
        );
        debug!("Column roles: {:?}", roles);
        if roles.is_unusable() {
            warn!("Header row has no name or code column, no rows can be imported");
        }

        let pipeline = RowPipeline::new(&criteria, &self.config);
        let mut summary = ImportSummary {
            header_row,
            criteria_rules: criteria.len(),
            ..Default::default()
        };

        let mut tx = self.db.begin().await?;
        let reconciler = Reconciler::prepare(&mut *tx).await?;

        for row_index in (header_row + 1)..main.height() {
            let Some(row) = pipeline.process(&main, row_index, &roles) else {
                summary.rows_skipped += 1;
                continue;
            };

            match reconciler.reconcile(&mut *tx, &row).await {
                Ok(outcome) => {
                    summary.measurements_created += 1;
                    if outcome.created {
                        summary.machines_created += 1;
                    } else {
                        summary.machines_updated += 1;
                    }
                    debug!(
                        "Row {}: '{}' crit {} priority {} color {:?}",
                        row_index + 1,
                        row.label(),
                        row.criticality,
                        row.priority,
                        row.color.color
                    );
                }
                Err(e) => {
                    warn!("Skipping row {} ('{}'): {}", row_index + 1, row.label(), e);
                    summary.rows_failed += 1;
                }
            }
        }

        tx.commit().await?;

        info!(
            "Import finished: {} measurements, {} machines created, {} updated, {} rows skipped, {} failed",
            summary.measurements_created,
            summary.machines_created,
            summary.machines_updated,
            summary.rows_skipped,
            summary.rows_failed
        );

        Ok(summary)
    }
}

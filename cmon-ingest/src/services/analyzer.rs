//! Offline workbook analysis
//!
//! Profiles every sheet of a workbook and scores its rows with the same pipeline the import
//! uses, without touching the store. Output files in the target directory:
//!
//! - `sheet_<name>.csv`: data rows, plus `_computed_score` / `_computed_matches` when the
//!   workbook has criteria rules
//! - `sheet_<name>_sample.csv`: first [`SAMPLE_ROWS`] rows of the same
//! - `summary.json`, `summary.txt`: per-sheet shape, columns and empty counts

use cmon_common::config::TomlConfig;
use csv::Writer;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::pipeline::{criteria, format_matches, header, CriteriaMap, RowPipeline};
use crate::pipeline::scoring::format_weight;
use crate::workbook::{CellValue, Sheet, Workbook, WorkbookError};

/// Rows written to the per-sheet sample file
pub const SAMPLE_ROWS: usize = 20;

/// Default output directory name, created next to the workbook
pub const DEFAULT_OUTPUT_DIR: &str = "analysis_output";

/// Analysis failures
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error(transparent)]
    Workbook(#[from] WorkbookError),

    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to write summary: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Value kinds found in one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Empty,
    Number,
    Text,
    Mixed,
}

/// Profile of one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub name: String,
    pub kind: ColumnKind,
    /// Data rows with no value in this column
    pub empty: usize,
}

/// Profile of one sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetAnalysis {
    pub name: String,
    /// Zero-based header row used for this sheet
    pub header_row: usize,
    pub rows: usize,
    pub cols: usize,
    pub columns: Vec<ColumnProfile>,
    /// Whether `_computed_*` columns were written
    pub scored: bool,
    pub full_csv: Option<PathBuf>,
    pub sample_csv: Option<PathBuf>,
}

/// Whole-workbook analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    pub file: String,
    pub output_dir: PathBuf,
    pub criteria_rules: usize,
    pub sheets: Vec<SheetAnalysis>,
}

/// `analysis_output` beside the workbook
pub fn default_output_dir(workbook: &Path) -> PathBuf {
    workbook
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_OUTPUT_DIR)
}

/// Sheet name reduced to filename-safe characters; spaces become underscores
pub fn safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Header labels; blank headers are named after their position
fn column_names(header: &[CellValue], width: usize) -> Vec<String> {
    (0..width)
        .map(|i| {
            header
                .get(i)
                .and_then(CellValue::trimmed_text)
                .unwrap_or_else(|| format!("Unnamed: {}", i))
        })
        .collect()
}

fn profile_columns(names: &[String], rows: &[Vec<CellValue>]) -> Vec<ColumnProfile> {
    names
        .iter()
        .enumerate()
        .map(|(col, name)| {
            let (mut empty, mut numbers, mut texts) = (0, 0, 0);
            for row in rows {
                match row.get(col).unwrap_or(&CellValue::Empty) {
                    CellValue::Empty => empty += 1,
                    CellValue::Number(_) => numbers += 1,
                    CellValue::Text(_) => texts += 1,
                }
            }

            let kind = match (numbers, texts) {
                (0, 0) => ColumnKind::Empty,
                (_, 0) => ColumnKind::Number,
                (0, _) => ColumnKind::Text,
                _ => ColumnKind::Mixed,
            };

            ColumnProfile {
                name: name.clone(),
                kind,
                empty,
            }
        })
        .collect()
}

/// Data rows below the header, without trailing blank rows
fn data_rows(sheet: &Sheet, header_row: usize) -> &[Vec<CellValue>] {
    let rows = sheet.rows().get(header_row + 1..).unwrap_or_default();
    let used = rows
        .iter()
        .rposition(|row| row.iter().any(|c| !c.is_empty()))
        .map_or(0, |last| last + 1);
    &rows[..used]
}

fn write_sheet_csv(
    path: &Path,
    names: &[String],
    rows: &[Vec<CellValue>],
    pipeline: Option<&RowPipeline<'_>>,
) -> Result<(), AnalyzeError> {
    let mut wtr = Writer::from_path(path)?;

    let mut header: Vec<String> = names.to_vec();
    if pipeline.is_some() {
        header.push("_computed_score".to_string());
        header.push("_computed_matches".to_string());
    }
    wtr.write_record(&header)?;

    for row in rows {
        let mut record: Vec<String> = (0..names.len())
            .map(|col| row.get(col).map(ToString::to_string).unwrap_or_default())
            .collect();
        if let Some(pipeline) = pipeline {
            let scored = pipeline.score(row);
            record.push(format_weight(scored.score));
            record.push(format_matches(&scored.matches));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

fn analyze_sheet(
    sheet: &Sheet,
    outdir: &Path,
    config: &TomlConfig,
    pipeline: Option<&RowPipeline<'_>>,
) -> Result<SheetAnalysis, AnalyzeError> {
    let header_row = header::locate(sheet, config.workbook.header_max_scan);
    let names = column_names(sheet.row(header_row).unwrap_or_default(), sheet.width());
    let rows = data_rows(sheet, header_row);
    let base = format!("sheet_{}", safe_filename(sheet.name()));

    let full_csv = outdir.join(format!("{}.csv", base));
    write_sheet_csv(&full_csv, &names, rows, pipeline)?;

    let sample_csv = outdir.join(format!("{}_sample.csv", base));
    write_sheet_csv(&sample_csv, &names, &rows[..rows.len().min(SAMPLE_ROWS)], pipeline)?;

    Ok(SheetAnalysis {
        name: sheet.name().to_string(),
        header_row,
        rows: rows.len(),
        cols: names.len(),
        columns: profile_columns(&names, rows),
        scored: pipeline.is_some(),
        full_csv: Some(full_csv),
        sample_csv: Some(sample_csv),
    })
}

/// Plain-text rendition of the summary
pub fn render_summary(summary: &AnalysisSummary) -> String {
    let mut lines = vec![
        format!("Analysis of {}", summary.file),
        format!("Criteria rules: {}", summary.criteria_rules),
        String::new(),
    ];

    for sheet in &summary.sheets {
        let names: Vec<&str> = sheet.columns.iter().map(|c| c.name.as_str()).collect();
        let kinds: Vec<String> = sheet
            .columns
            .iter()
            .map(|c| format!("{}={:?}", c.name, c.kind))
            .collect();
        let empties: Vec<String> = sheet
            .columns
            .iter()
            .map(|c| format!("{}={}", c.name, c.empty))
            .collect();

        lines.push(format!("Sheet: {}", sheet.name));
        lines.push(format!(
            "  Header row: {}, Rows: {}, Columns: {}",
            sheet.header_row + 1,
            sheet.rows,
            sheet.cols
        ));
        lines.push(format!("  Columns: {}", names.join(", ")));
        lines.push(format!("  Kinds: {}", kinds.join(", ")));
        lines.push(format!("  Empty: {}", empties.join(", ")));
        lines.push(String::new());
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Analyze every sheet of `workbook_path` into `outdir`
///
/// Blocking; run it off the async runtime. A sheet that cannot be read is logged and left
/// out of the summary.
pub fn analyze(workbook_path: &Path, outdir: &Path, config: &TomlConfig) -> Result<AnalysisSummary, AnalyzeError> {
    std::fs::create_dir_all(outdir)?;
    let mut workbook = Workbook::open(workbook_path)?;

    let criteria_sheet = &config.workbook.criteria_sheet;
    let rulebook = if workbook.has_sheet(criteria_sheet) {
        match workbook.sheet(criteria_sheet) {
            Ok(sheet) => criteria::extract(&sheet),
            Err(e) => {
                warn!("Criteria sheet unreadable: {}", e);
                CriteriaMap::new()
            }
        }
    } else {
        CriteriaMap::new()
    };
    let pipeline = (!rulebook.is_empty()).then(|| RowPipeline::new(&rulebook, config));

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let sheet = match workbook.sheet(&name) {
            Ok(sheet) => sheet,
            Err(e) => {
                warn!("Skipping sheet '{}': {}", name, e);
                continue;
            }
        };
        sheets.push(analyze_sheet(&sheet, outdir, config, pipeline.as_ref())?);
    }

    let summary = AnalysisSummary {
        file: workbook_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        output_dir: outdir.to_path_buf(),
        criteria_rules: rulebook.len(),
        sheets,
    };

    std::fs::write(outdir.join("summary.json"), serde_json::to_string_pretty(&summary)?)?;
    std::fs::write(outdir.join("summary.txt"), render_summary(&summary))?;

    info!(
        "Analysis of {} complete: {} sheets written to {}",
        summary.file,
        summary.sheets.len(),
        outdir.display()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("CM Matrix equipos principales"), "CM_Matrix_equipos_principales");
        assert_eq!(safe_filename("Criterios/2024"), "Criterios_2024");
        assert_eq!(safe_filename("Área-1"), "Área-1");
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            default_output_dir(Path::new("/data/matrix.xlsx")),
            PathBuf::from("/data/analysis_output")
        );
    }

    #[test]
    fn test_column_profiles() {
        let names = column_names(
            &[CellValue::Text("Código".into()), CellValue::Empty],
            3,
        );
        assert_eq!(names, vec!["Código", "Unnamed: 1", "Unnamed: 2"]);

        let rows = vec![
            vec![CellValue::Text("P-01".into()), CellValue::Number(1.0), CellValue::Empty],
            vec![CellValue::Number(7.0), CellValue::Number(2.0), CellValue::Empty],
        ];
        let profiles = profile_columns(&names, &rows);
        assert_eq!(profiles[0].kind, ColumnKind::Mixed);
        assert_eq!(profiles[1].kind, ColumnKind::Number);
        assert_eq!(profiles[2].kind, ColumnKind::Empty);
        assert_eq!(profiles[2].empty, 2);
    }

    #[test]
    fn test_trailing_blank_rows_dropped() {
        let sheet = Sheet::new(
            "S",
            vec![
                vec![CellValue::Text("AREA".into())],
                vec![CellValue::Text("x".into())],
                vec![CellValue::Empty],
                vec![CellValue::Text("y".into())],
                vec![CellValue::Empty],
            ],
        );
        assert_eq!(data_rows(&sheet, 0).len(), 3);
        assert!(data_rows(&sheet, 10).is_empty());
    }

    #[test]
    fn test_render_summary_lists_each_sheet() {
        let summary = AnalysisSummary {
            file: "matrix.xlsx".into(),
            output_dir: PathBuf::from("/tmp/out"),
            criteria_rules: 2,
            sheets: vec![SheetAnalysis {
                name: "Criterios".into(),
                header_row: 0,
                rows: 2,
                cols: 2,
                columns: vec![
                    ColumnProfile {
                        name: "Criterio".into(),
                        kind: ColumnKind::Text,
                        empty: 0,
                    },
                    ColumnProfile {
                        name: "Factor".into(),
                        kind: ColumnKind::Number,
                        empty: 1,
                    },
                ],
                scored: false,
                full_csv: None,
                sample_csv: None,
            }],
        };

        assert_eq!(
            render_summary(&summary),
            "Analysis of matrix.xlsx\n\
             Criteria rules: 2\n\
             \n\
             Sheet: Criterios\n\
             \x20 Header row: 1, Rows: 2, Columns: 2\n\
             \x20 Columns: Criterio, Factor\n\
             \x20 Kinds: Criterio=Text, Factor=Number\n\
             \x20 Empty: Criterio=0, Factor=1\n\
             \n"
        );

        let empty = AnalysisSummary {
            sheets: Vec::new(),
            ..summary
        };
        assert_eq!(render_summary(&empty), "Analysis of matrix.xlsx\nCriteria rules: 2\n\n");
    }
}

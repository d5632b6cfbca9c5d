//! Workbook analysis integration tests

mod helpers;

use cmon_common::config::TomlConfig;
use cmon_ingest::services::analyzer::{analyze, ColumnKind};
use helpers::{matrix_workbook, MatrixRow, MatrixLayout};
use serde_json::Value;
use tempfile::TempDir;

fn read_csv(path: &std::path::Path) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn test_analysis_writes_scored_sheet_files() {
    let dir = TempDir::new().unwrap();
    let layout = MatrixLayout {
        title_rows: 1,
        rows: vec![
            MatrixRow::new("Pump A", "P-01").comment("needs oil"),
            MatrixRow::new("Valve B", "V-02"),
        ],
        criteria: Some(vec![("Pump", 4.0), ("Valve", 2.5)]),
        ..Default::default()
    };
    let path = matrix_workbook(dir.path(), &layout).unwrap();
    let outdir = dir.path().join("out");

    let summary = analyze(&path, &outdir, &TomlConfig::default()).unwrap();
    assert_eq!(summary.criteria_rules, 2);
    assert_eq!(summary.sheets.len(), 2);

    let main = &summary.sheets[0];
    assert_eq!(main.header_row, 1);
    assert_eq!(main.rows, 2);
    assert!(main.scored);
    assert_eq!(main.columns[1].name, "DENOMINACIÓN");
    assert_eq!(main.columns[1].kind, ColumnKind::Text);
    assert_eq!(main.columns[3].kind, ColumnKind::Empty);
    assert_eq!(main.columns[4].empty, 1);

    let records = read_csv(&outdir.join("sheet_CM_Matrix_equipos_principales.csv"));
    assert_eq!(records.len(), 3);
    assert_eq!(records[0][5], "_computed_score");
    assert_eq!(records[0][6], "_computed_matches");
    assert_eq!(records[1][1], "Pump A");
    assert_eq!(records[1][5], "4.0");
    assert_eq!(records[1][6], "PUMP:4.0");
    assert_eq!(records[2][6], "VALVE:2.5");

    assert!(outdir.join("sheet_CM_Matrix_equipos_principales_sample.csv").exists());
    assert!(outdir.join("sheet_Criterios.csv").exists());
    assert!(outdir.join("summary.txt").exists());

    let json: Value =
        serde_json::from_str(&std::fs::read_to_string(outdir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(json["file"], "matrix.xlsx");
    assert_eq!(json["sheets"][0]["name"], "CM Matrix equipos principales");
}

#[test]
fn test_analysis_without_criteria_has_no_computed_columns() {
    let dir = TempDir::new().unwrap();
    let layout = MatrixLayout {
        rows: vec![MatrixRow::new("Pump A", "P-01")],
        criteria: None,
        ..Default::default()
    };
    let path = matrix_workbook(dir.path(), &layout).unwrap();
    let outdir = dir.path().join("out");

    let summary = analyze(&path, &outdir, &TomlConfig::default()).unwrap();
    assert_eq!(summary.criteria_rules, 0);
    assert!(!summary.sheets[0].scored);

    let records = read_csv(&outdir.join("sheet_CM_Matrix_equipos_principales.csv"));
    assert_eq!(records[0].len(), 5);
}

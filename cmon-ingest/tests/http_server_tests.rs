//! HTTP Server & Routing Integration Tests

mod helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cmon_common::config::TomlConfig;
use cmon_ingest::{build_router, AppState};
use helpers::{create_test_db, machine_count, matrix_workbook, MatrixRow, MatrixLayout};
use http_body_util::BodyExt;
use serde_json::Value;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

async fn get(app: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_reports_module() {
    let (_db_dir, pool) = create_test_db().await.unwrap();
    let state = AppState::new(pool, TomlConfig::default(), PathBuf::from("unused.xlsx"));

    let (status, body) = get(build_router(state), "/health").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "cmon-ingest");
    assert_eq!(json["import_running"], false);
}

#[tokio::test]
async fn test_import_excel_returns_count_message() {
    let (_db_dir, pool) = create_test_db().await.unwrap();
    let dir = TempDir::new().unwrap();
    let layout = MatrixLayout {
        rows: vec![
            MatrixRow::new("Pump A", "P-01").comment("needs oil").fill(0xDC2828),
            MatrixRow::new("Valve B", "V-02"),
        ],
        criteria: Some(vec![("Pump", 4.0)]),
        ..Default::default()
    };
    let path = matrix_workbook(dir.path(), &layout).unwrap();
    let state = AppState::new(pool.clone(), TomlConfig::default(), path);

    let (status, body) = get(build_router(state), "/import_excel").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "Import completed. 2 measurements created.");
    assert_eq!(machine_count(&pool).await, 2);
}

#[tokio::test]
async fn test_import_excel_missing_workbook() {
    let (_db_dir, pool) = create_test_db().await.unwrap();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.xlsx");
    let state = AppState::new(pool, TomlConfig::default(), path.clone());

    let (status, body) = get(build_router(state), "/import_excel").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, format!("Workbook not found: {}", path.display()));
}

#[tokio::test]
async fn test_import_excel_rejects_concurrent_import() {
    let (_db_dir, pool) = create_test_db().await.unwrap();
    let state = AppState::new(pool, TomlConfig::default(), PathBuf::from("unused.xlsx"));
    let _running = state.import_lock.clone().try_lock_owned().unwrap();

    let (status, _) = get(build_router(state.clone()), "/import_excel").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = get(build_router(state), "/health").await;
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["import_running"], true);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_db_dir, pool) = create_test_db().await.unwrap();
    let state = AppState::new(pool, TomlConfig::default(), PathBuf::from("unused.xlsx"));

    let (status, _) = get(build_router(state), "/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

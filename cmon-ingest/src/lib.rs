//! cmon-ingest library interface
//!
//! Exposes the workbook pipeline, the store layer and the HTTP router for the binary and
//! for integration testing.

pub mod api;
pub mod db;
pub mod error;
pub mod pipeline;
pub mod services;
pub mod workbook;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use cmon_common::config::TomlConfig;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
    /// Workbook imported by `GET /import_excel`
    pub workbook_path: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Held for the duration of an import
    pub import_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: TomlConfig, workbook_path: PathBuf) -> Self {
        Self {
            db,
            config: Arc::new(config),
            workbook_path,
            startup_time: Utc::now(),
            import_lock: Arc::new(Mutex::new(())),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::import_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

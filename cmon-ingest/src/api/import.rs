//! GET /import_excel

use axum::{extract::State, routing::get, Router};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::ImportOrchestrator;
use crate::AppState;

/// GET /import_excel
///
/// Imports the configured workbook and answers `Import completed. N measurements created.`
/// Only one import runs at a time per process; a concurrent request gets 409.
pub async fn import_excel(State(state): State<AppState>) -> ApiResult<String> {
    let _guard = state
        .import_lock
        .try_lock()
        .map_err(|_| ApiError::Conflict("An import is already running".to_string()))?;

    info!("Import requested for {}", state.workbook_path.display());

    let orchestrator = ImportOrchestrator::new(state.db.clone(), state.config.as_ref().clone());
    let summary = orchestrator.run(&state.workbook_path).await?;

    Ok(summary.message())
}

/// Build import routes
pub fn import_routes() -> Router<AppState> {
    Router::new().route("/import_excel", get(import_excel))
}

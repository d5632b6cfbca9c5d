//! HTTP error mapping
//!
//! Bodies are plain text so the import endpoint answers the same way on success and
//! failure.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::ImportError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Conflict (409), e.g. import already running
    #[error("{0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),
}

impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::WorkbookNotFound(path) => {
                ApiError::NotFound(format!("Workbook not found: {}", path.display()))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::WorkbookError;
    use std::path::PathBuf;

    #[test]
    fn test_import_errors_map_to_status() {
        let missing: ApiError = ImportError::WorkbookNotFound(PathBuf::from("/x.xlsx")).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(missing.to_string(), "Workbook not found: /x.xlsx");

        let unreadable: ApiError = ImportError::MainSheet {
            sheet: "CM Matrix equipos principales".into(),
            source: WorkbookError::MissingSheet("CM Matrix equipos principales".into()),
        }
        .into();
        assert_eq!(unreadable.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(unreadable.to_string().starts_with("Error reading main sheet"));
    }
}

//! Common error types for the condition monitor store and configuration

use std::path::PathBuf;
use thiserror::Error;

/// Common result type for store and configuration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared by the store and configuration layers
#[derive(Error, Debug)]
pub enum Error {
    /// Store operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File system operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be resolved or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file exists but is not valid TOML for [`crate::config::TomlConfig`]
    #[error("Malformed configuration file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

//! # Condition Monitor Common Library
//!
//! Shared code for the condition monitor crates:
//! - Database models, schema creation and legacy column synchronization
//! - Configuration loading and path resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};

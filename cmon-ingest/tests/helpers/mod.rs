//! Test Helper Utilities
//!
//! Shared utilities for testing cmon-ingest

#![allow(dead_code, unused_imports)]

pub mod db_utils;
pub mod workbook_builder;

pub use db_utils::{create_test_db, machine_by_code, machine_count, measurements_of};
pub use workbook_builder::{matrix_workbook, MatrixRow, MatrixLayout, CRITERIA_SHEET, MAIN_SHEET};

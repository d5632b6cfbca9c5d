//! Store queries used by the import and the statistics commands
//!
//! Writes take `&mut SqliteConnection` so they run inside the caller's transaction;
//! read-only reports take the pool.

pub mod machines;
pub mod measurements;
pub mod tools;

//! Database models, initialization and schema maintenance

pub mod init;
pub mod models;
pub mod schema_sync;
pub mod table_schemas;

pub use init::*;
pub use models::*;
pub use table_schemas::sync_all_table_schemas;

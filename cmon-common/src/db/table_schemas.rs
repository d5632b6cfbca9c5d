//! Declared column sets for every store table

use crate::db::schema_sync::{ColumnDefinition, SchemaSync, TableSchema};
use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

/// `machines`
pub struct MachinesTableSchema;

impl TableSchema for MachinesTableSchema {
    fn table_name() -> &'static str {
        "machines"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null().unique(),
            ColumnDefinition::new("hac_code", "TEXT"),
            ColumnDefinition::new("notes", "TEXT").not_null().default("''"),
            ColumnDefinition::new("priority", "INTEGER").not_null().default("1"),
            ColumnDefinition::new("machine_group", "INTEGER").not_null().default("1"),
            ColumnDefinition::new("color", "TEXT"),
            ColumnDefinition::new("color_hex", "TEXT"),
            ColumnDefinition::new("machine_type", "TEXT"),
        ]
    }
}

/// `tools`
pub struct ToolsTableSchema;

impl TableSchema for ToolsTableSchema {
    fn table_name() -> &'static str {
        "tools"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("name", "TEXT").not_null().unique(),
            ColumnDefinition::new("description", "TEXT"),
        ]
    }
}

/// `measurements`
pub struct MeasurementsTableSchema;

impl TableSchema for MeasurementsTableSchema {
    fn table_name() -> &'static str {
        "measurements"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("id", "INTEGER").primary_key(),
            ColumnDefinition::new("machine_id", "INTEGER").not_null(),
            ColumnDefinition::new("tool_id", "INTEGER").not_null(),
            ColumnDefinition::new("date", "TEXT").not_null().default("''"),
            ColumnDefinition::new("criticality", "INTEGER"),
            ColumnDefinition::new("note", "TEXT"),
            ColumnDefinition::new("severity", "TEXT"),
            ColumnDefinition::new("repair_time", "TEXT"),
        ]
    }
}

/// Bring every table's columns up to date
///
/// Returns the total number of columns added.
pub async fn sync_all_table_schemas(pool: &SqlitePool) -> Result<usize> {
    let mut added = 0;
    added += SchemaSync::sync_table::<MachinesTableSchema>(pool).await?.len();
    added += SchemaSync::sync_table::<ToolsTableSchema>(pool).await?.len();
    added += SchemaSync::sync_table::<MeasurementsTableSchema>(pool).await?.len();

    if added > 0 {
        info!("Schema synchronization added {} column(s)", added);
    }

    Ok(added)
}

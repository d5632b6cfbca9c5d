//! Declarative column synchronization
//!
//! Stores created by earlier releases only had `id`, `name` and `notes` on machines and
//! lacked the severity columns on measurements. Instead of hand-written `ALTER TABLE`
//! steps, every table declares its expected columns and missing ones are added on startup.
//!
//! Initialization order:
//! 1. **CREATE TABLE IF NOT EXISTS** - create missing tables with the full column set
//! 2. **Column sync** - add columns missing from tables that already existed (THIS MODULE)
//!
//! ```rust,ignore
//! pub struct ToolsTableSchema;
//!
//! impl TableSchema for ToolsTableSchema {
//!     fn table_name() -> &'static str { "tools" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "INTEGER").primary_key(),
//!             ColumnDefinition::new("name", "TEXT").not_null().unique(),
//!             ColumnDefinition::new("description", "TEXT"),
//!         ]
//!     }
//! }
//!
//! SchemaSync::sync_table::<ToolsTableSchema>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// SQL type (e.g. "TEXT", "INTEGER")
    pub sql_type: String,
    pub not_null: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// DEFAULT clause value, already SQL-quoted where needed
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            unique: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// `ALTER TABLE ... ADD COLUMN` fragment
    ///
    /// SQLite cannot add PRIMARY KEY or UNIQUE columns, and NOT NULL only with a default,
    /// so those constraints are dropped here with a warning.
    fn add_column_clause(&self, table: &str) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);

        if self.primary_key || self.unique {
            warn!(
                "Cannot add PRIMARY KEY/UNIQUE column {}.{} via ALTER TABLE, adding it unconstrained",
                table, self.name
            );
        }

        match (&self.default_value, self.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "Cannot add NOT NULL column {}.{} without DEFAULT, adding it nullable",
                table, self.name
            ),
            (None, false) => {}
        }

        sql
    }
}

/// Column as reported by `PRAGMA table_info`
#[derive(Debug, Clone)]
pub struct ActualColumn {
    pub cid: i32,
    pub name: String,
    pub type_name: String,
}

/// Difference between declared and actual schema
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaDrift {
    /// Column missing from the database (fixable)
    MissingColumn { table: String, column: ColumnDefinition },
    /// Column present with an incompatible type (reported only)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
}

/// Expected schema of one table
pub trait TableSchema {
    fn table_name() -> &'static str;

    /// Expected columns in creation order
    fn expected_columns() -> Vec<ColumnDefinition>;
}

/// Read actual columns of `table_name`, ordered by position
pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
    let query = format!("PRAGMA table_info({})", table_name);
    let rows = sqlx::query(&query).fetch_all(pool).await?;

    let mut columns: Vec<ActualColumn> = rows
        .iter()
        .map(|row| ActualColumn {
            cid: row.get("cid"),
            name: row.get("name"),
            type_name: row.get("type"),
        })
        .collect();
    columns.sort_by_key(|c| c.cid);

    Ok(columns)
}

/// Whether `table_name` exists
pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?)",
    )
    .bind(table_name)
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Compare declared columns against the database
pub fn compare(table: &str, expected: &[ColumnDefinition], actual: &[ActualColumn]) -> Vec<SchemaDrift> {
    expected
        .iter()
        .filter_map(|col| match actual.iter().find(|a| a.name.eq_ignore_ascii_case(&col.name)) {
            None => Some(SchemaDrift::MissingColumn {
                table: table.to_string(),
                column: col.clone(),
            }),
            Some(a) if !types_compatible(&col.sql_type, &a.type_name) => Some(SchemaDrift::TypeMismatch {
                table: table.to_string(),
                column: col.name.clone(),
                expected: col.sql_type.clone(),
                actual: a.type_name.clone(),
            }),
            Some(_) => None,
        })
        .collect()
}

/// SQLite type affinity comparison
///
/// Untyped legacy columns (empty declared type) are accepted for anything.
fn types_compatible(expected: &str, actual: &str) -> bool {
    let exp = expected.to_uppercase();
    let act = actual.to_uppercase();

    if exp == act || act.is_empty() {
        return true;
    }

    let affinity = |t: &str| {
        if t.contains("INT") {
            "INTEGER"
        } else if t.contains("CHAR") || t.contains("CLOB") || t.contains("TEXT") {
            "TEXT"
        } else if t.contains("REAL") || t.contains("FLOA") || t.contains("DOUB") {
            "REAL"
        } else {
            "NUMERIC"
        }
    };

    affinity(&exp) == affinity(&act)
}

/// Applies [`SchemaDrift::MissingColumn`] fixes
pub struct SchemaSync;

impl SchemaSync {
    /// Add every declared column missing from `T`'s table
    ///
    /// Returns the names of added columns. Type mismatches are logged, never altered.
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<Vec<String>> {
        let table = T::table_name();

        if !table_exists(pool, table).await? {
            warn!("Table '{}' does not exist, skipping column sync", table);
            return Ok(Vec::new());
        }

        let actual = introspect_table(pool, table).await?;
        let drift = compare(table, &T::expected_columns(), &actual);

        if drift.is_empty() {
            debug!("Schema up to date for '{}'", table);
            return Ok(Vec::new());
        }

        let mut added = Vec::new();
        for change in drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    if Self::add_column(pool, &table, &column).await? {
                        added.push(column.name);
                    }
                }
                SchemaDrift::TypeMismatch {
                    table,
                    column,
                    expected,
                    actual,
                } => {
                    warn!(
                        "Type mismatch in {}.{}: expected '{}', found '{}', leaving as is",
                        table, column, expected, actual
                    );
                }
            }
        }

        Ok(added)
    }

    /// Returns `false` when another initializer added the column first
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<bool> {
        let sql = format!("ALTER TABLE {} ADD COLUMN {}", table, column.add_column_clause(table));

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => {
                info!("Added column {}.{} ({})", table, column.name, column.sql_type);
                Ok(true)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                debug!("Column {}.{} already added concurrently", table, column.name);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }
}

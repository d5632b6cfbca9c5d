//! Measurement tools

use cmon_common::db::Tool;
use cmon_common::Result;
use sqlx::{Row, SqliteConnection};
use tracing::info;

/// Load tool by name
pub async fn find_tool(conn: &mut SqliteConnection, name: &str) -> Result<Option<Tool>> {
    let row = sqlx::query("SELECT id, name, description FROM tools WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| Tool {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
    }))
}

/// Id of tool `name`, creating it when missing
pub async fn ensure_tool(conn: &mut SqliteConnection, name: &str, description: &str) -> Result<i64> {
    if let Some(tool) = find_tool(conn, name).await? {
        return Ok(tool.id);
    }

    let result = sqlx::query("INSERT INTO tools (name, description) VALUES (?, ?)")
        .bind(name)
        .bind(description)
        .execute(&mut *conn)
        .await?;

    info!("Created tool '{}'", name);
    Ok(result.last_insert_rowid())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmon_common::db::{init_schema, AUTO_IMPORT_TOOL, AUTO_IMPORT_TOOL_DESCRIPTION};
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_ensure_tool_is_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        let mut conn = pool.acquire().await.unwrap();

        let first = ensure_tool(&mut conn, AUTO_IMPORT_TOOL, AUTO_IMPORT_TOOL_DESCRIPTION)
            .await
            .unwrap();
        let second = ensure_tool(&mut conn, AUTO_IMPORT_TOOL, "other description")
            .await
            .unwrap();
        assert_eq!(first, second);

        let tool = find_tool(&mut conn, AUTO_IMPORT_TOOL).await.unwrap().unwrap();
        assert_eq!(tool.description.as_deref(), Some(AUTO_IMPORT_TOOL_DESCRIPTION));
    }
}

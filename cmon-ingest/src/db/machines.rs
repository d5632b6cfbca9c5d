//! Machine lookups and writes used by the import

use cmon_common::db::{clamp_priority, Machine, SeverityColor};
use cmon_common::Result;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

// Legacy stores allow NULL notes, priority and machine_group
const MACHINE_COLUMNS: &str = "id, name, hac_code, COALESCE(notes, '') AS notes, \
     COALESCE(priority, 1) AS priority, COALESCE(machine_group, 1) AS machine_group, \
     color, color_hex, machine_type";

fn machine_from_row(row: &SqliteRow) -> Machine {
    Machine {
        id: row.get("id"),
        name: row.get("name"),
        hac_code: row.get("hac_code"),
        notes: row.get("notes"),
        priority: row.get("priority"),
        machine_group: row.get("machine_group"),
        color: row
            .get::<Option<String>, _>("color")
            .as_deref()
            .and_then(SeverityColor::parse),
        color_hex: row.get("color_hex"),
        machine_type: row.get("machine_type"),
    }
}

/// Fields of a machine created by the import
#[derive(Debug, Clone, PartialEq)]
pub struct NewMachine {
    pub name: String,
    pub hac_code: Option<String>,
    pub notes: String,
    pub priority: i64,
    pub color: Option<SeverityColor>,
    pub color_hex: Option<String>,
    pub machine_type: Option<String>,
}

/// Fields the import overwrites on an existing machine
#[derive(Debug, Clone, PartialEq)]
pub struct MachineUpdate {
    pub priority: i64,
    /// Already merged with the stored notes
    pub notes: String,
    /// `None` clears both color columns
    pub color: Option<SeverityColor>,
    pub color_hex: Option<String>,
    /// `None` keeps the stored type
    pub machine_type: Option<String>,
    /// `None` keeps the stored code
    pub hac_code: Option<String>,
}

/// Append `addition` to `existing` on a new line
///
/// Blank additions leave the notes untouched; nothing is ever replaced.
pub fn merge_notes(existing: &str, addition: &str) -> String {
    if addition.is_empty() {
        existing.to_string()
    } else if existing.is_empty() {
        addition.to_string()
    } else {
        format!("{}\n{}", existing, addition)
    }
}

/// First machine (lowest id) whose HAC code equals `code` or whose name contains it
///
/// Containment is case-sensitive and literal (`instr`, not `LIKE`).
pub async fn find_by_code(conn: &mut SqliteConnection, code: &str) -> Result<Option<Machine>> {
    let sql = format!(
        "SELECT {} FROM machines WHERE hac_code = ? OR instr(name, ?) > 0 ORDER BY id LIMIT 1",
        MACHINE_COLUMNS
    );
    let row = sqlx::query(&sql)
        .bind(code)
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().map(machine_from_row))
}

/// Machine with exactly this name
pub async fn find_by_name(conn: &mut SqliteConnection, name: &str) -> Result<Option<Machine>> {
    let sql = format!("SELECT {} FROM machines WHERE name = ?", MACHINE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.as_ref().map(machine_from_row))
}

/// Load machine by id
pub async fn load_machine(conn: &mut SqliteConnection, id: i64) -> Result<Option<Machine>> {
    let sql = format!("SELECT {} FROM machines WHERE id = ?", MACHINE_COLUMNS);
    let row = sqlx::query(&sql).bind(id).fetch_optional(&mut *conn).await?;

    Ok(row.as_ref().map(machine_from_row))
}

/// Insert a machine in group 1, returning its id
pub async fn insert_machine(conn: &mut SqliteConnection, machine: &NewMachine) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO machines (name, notes, priority, machine_group, color, color_hex, machine_type, hac_code)
        VALUES (?, ?, ?, 1, ?, ?, ?, ?)
        "#,
    )
    .bind(&machine.name)
    .bind(&machine.notes)
    .bind(clamp_priority(machine.priority))
    .bind(machine.color.map(|c| c.as_str()))
    .bind(machine.color.and(machine.color_hex.as_deref()))
    .bind(&machine.machine_type)
    .bind(&machine.hac_code)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Apply an import update to machine `id`
pub async fn update_machine(conn: &mut SqliteConnection, id: i64, update: &MachineUpdate) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE machines SET
            priority = ?,
            notes = ?,
            color = ?,
            color_hex = ?,
            machine_type = COALESCE(?, machine_type),
            hac_code = COALESCE(?, hac_code)
        WHERE id = ?
        "#,
    )
    .bind(clamp_priority(update.priority))
    .bind(&update.notes)
    .bind(update.color.map(|c| c.as_str()))
    .bind(update.color.and(update.color_hex.as_deref()))
    .bind(&update.machine_type)
    .bind(&update.hac_code)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Number of machines
pub async fn count_machines(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM machines")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Machines per stored color value; uncolored machines are counted under `None`
pub async fn color_counts(pool: &SqlitePool) -> Result<Vec<(Option<String>, i64)>> {
    let rows = sqlx::query(
        "SELECT color, COUNT(*) AS machines FROM machines GROUP BY color ORDER BY color",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("color"), row.get("machines")))
        .collect())
}

/// Compact machine listing for the color statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineSummary {
    pub id: i64,
    pub name: String,
    pub priority: i64,
    pub color: Option<String>,
}

/// First `limit` machines by id
pub async fn sample_machines(pool: &SqlitePool, limit: i64) -> Result<Vec<MachineSummary>> {
    let rows = sqlx::query(
        "SELECT id, name, COALESCE(priority, 1) AS priority, color FROM machines ORDER BY id LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| MachineSummary {
            id: row.get("id"),
            name: row.get("name"),
            priority: row.get("priority"),
            color: row.get("color"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmon_common::db::init_schema;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        // Single connection so every query sees the same in-memory database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        pool
    }

    fn new_machine(name: &str, code: Option<&str>) -> NewMachine {
        NewMachine {
            name: name.to_string(),
            hac_code: code.map(str::to_string),
            notes: String::new(),
            priority: 1,
            color: None,
            color_hex: None,
            machine_type: None,
        }
    }

    #[test]
    fn test_merge_notes() {
        assert_eq!(merge_notes("", "needs oil"), "needs oil");
        assert_eq!(merge_notes("needs oil", "needs oil"), "needs oil\nneeds oil");
        assert_eq!(merge_notes("kept", ""), "kept");
        assert_eq!(merge_notes("", ""), "");
    }

    #[tokio::test]
    async fn test_find_by_code_matches_code_or_name_containment() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let first = insert_machine(&mut conn, &new_machine("Bomba P-01 norte", None)).await.unwrap();
        let second = insert_machine(&mut conn, &new_machine("Pump A", Some("P-01"))).await.unwrap();

        let found = find_by_code(&mut conn, "P-01").await.unwrap().unwrap();
        assert_eq!(found.id, first, "lowest id wins");
        assert!(second > first);

        assert!(find_by_code(&mut conn, "p-01").await.unwrap().is_none(), "case-sensitive");
        assert!(find_by_code(&mut conn, "P_01").await.unwrap().is_none(), "no LIKE wildcards");
    }

    #[tokio::test]
    async fn test_update_clears_color_and_keeps_type_and_code() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let mut machine = new_machine("Pump A", Some("P-01"));
        machine.color = Some(SeverityColor::Red);
        machine.color_hex = Some("DC2828".into());
        machine.machine_type = Some("Centrífuga".into());
        let id = insert_machine(&mut conn, &machine).await.unwrap();

        update_machine(
            &mut conn,
            id,
            &MachineUpdate {
                priority: 2,
                notes: "checked".into(),
                color: None,
                color_hex: Some("ignored".into()),
                machine_type: None,
                hac_code: None,
            },
        )
        .await
        .unwrap();

        let stored = load_machine(&mut conn, id).await.unwrap().unwrap();
        assert_eq!(stored.priority, 2);
        assert_eq!(stored.notes, "checked");
        assert_eq!(stored.color, None);
        assert_eq!(stored.color_hex, None);
        assert_eq!(stored.machine_type.as_deref(), Some("Centrífuga"));
        assert_eq!(stored.hac_code.as_deref(), Some("P-01"));
        assert_eq!(stored.machine_group, 1);
    }

    #[tokio::test]
    async fn test_color_statistics() {
        let pool = memory_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        for (name, color) in [("A", Some(SeverityColor::Red)), ("B", Some(SeverityColor::Red)), ("C", None)] {
            let mut machine = new_machine(name, None);
            machine.color = color;
            machine.color_hex = color.map(|_| "FF0000".to_string());
            insert_machine(&mut conn, &machine).await.unwrap();
        }
        drop(conn);

        let counts = color_counts(&pool).await.unwrap();
        assert_eq!(counts, vec![(None, 1), (Some("red".to_string()), 2)]);

        let sample = sample_machines(&pool, 2).await.unwrap();
        assert_eq!(sample.len(), 2);
        assert_eq!(sample[0].name, "A");
        assert_eq!(sample[0].color.as_deref(), Some("red"));
        assert_eq!(count_machines(&pool).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_legacy_null_priority_and_group_read_as_one() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE machines (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE, \
             notes TEXT, priority INTEGER, machine_group INTEGER)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO machines (name, notes, priority, machine_group) VALUES ('Old press', NULL, NULL, NULL)")
            .execute(&pool)
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let machine = find_by_name(&mut conn, "Old press").await.unwrap().unwrap();
        assert_eq!(machine.notes, "");
        assert_eq!(machine.priority, 1);
        assert_eq!(machine.machine_group, 1);
        assert_eq!(machine.color, None);
        drop(conn);

        let sample = sample_machines(&pool, 5).await.unwrap();
        assert_eq!(sample[0].priority, 1);
    }
}

use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradebook.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    Ok(conn)
}

#[cfg(test)]
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    // Values are JSON text; the schema does not validate them. Readers decide
    // what to do with malformed values.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT
        )",
        [],
    )?;
    ensure_kv_updated_at(conn)?;
    Ok(())
}

// Workspaces created before updated_at was tracked lack the column.
fn ensure_kv_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "kv", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE kv ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

pub fn kv_get(conn: &Connection, key: &str) -> anyhow::Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| {
            row.get::<_, String>(0)
        })
        .optional()?;
    Ok(value)
}

pub fn kv_set(conn: &Connection, key: &str, value: &str) -> anyhow::Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO kv(key, value, updated_at) VALUES(?, ?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        (key, value, &now),
    )?;
    Ok(())
}

pub fn kv_remove(conn: &Connection, key: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_set_overwrites_and_remove_deletes() {
        let conn = open_in_memory().expect("open");
        assert_eq!(kv_get(&conn, "users").expect("get"), None);

        kv_set(&conn, "users", "[]").expect("set");
        kv_set(&conn, "users", "[1]").expect("overwrite");
        assert_eq!(kv_get(&conn, "users").expect("get"), Some("[1]".into()));

        kv_remove(&conn, "users").expect("remove");
        assert_eq!(kv_get(&conn, "users").expect("get"), None);
        // Removing a missing key is fine.
        kv_remove(&conn, "users").expect("remove again");
    }

    #[test]
    fn legacy_kv_table_gains_updated_at() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE kv(key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )
        .expect("legacy table");
        conn.execute("INSERT INTO kv(key, value) VALUES('users', '[]')", [])
            .expect("legacy row");

        init_schema(&conn).expect("migrate");
        assert!(table_has_column(&conn, "kv", "updated_at").expect("pragma"));
        assert_eq!(kv_get(&conn, "users").expect("get"), Some("[]".into()));
    }
}

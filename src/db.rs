use rusqlite::Connection;
use std::path::Path;

pub const DB_FILE: &str = "deanlist.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Fresh database with no backing file. Used by tests and dry runs.
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS dean_lists(
            id TEXT PRIMARY KEY,
            semester TEXT NOT NULL CHECK(semester IN ('fall', 'spring')),
            year INTEGER NOT NULL,
            source_file TEXT,
            source_sha256 TEXT,
            created_at TEXT NOT NULL,
            UNIQUE(semester, year)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS dean_list_students(
            id TEXT PRIMARY KEY,
            dean_list_id TEXT NOT NULL,
            semester TEXT NOT NULL,
            year INTEGER NOT NULL,
            student_id TEXT NOT NULL,
            student_name TEXT NOT NULL,
            major TEXT NOT NULL DEFAULT '',
            gpa REAL NOT NULL DEFAULT 0,
            passed_credits INTEGER NOT NULL DEFAULT 0,
            registered_credits INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY(dean_list_id) REFERENCES dean_lists(id) ON DELETE CASCADE
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dean_list_students_list ON dean_list_students(dean_list_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dean_list_students_year ON dean_list_students(year, semester)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_dean_list_students_student ON dean_list_students(student_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_settings(
            id INTEGER PRIMARY KEY,
            reconcile_scope TEXT NOT NULL DEFAULT 'all',
            min_student_id_digits INTEGER NOT NULL DEFAULT 5,
            archive_workbooks INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})")).unwrap();
        stmt.query_map([], |r| r.get(1))
            .unwrap()
            .collect::<rusqlite::Result<Vec<String>>>()
            .unwrap()
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = open_in_memory().expect("open");
        init_schema(&conn).expect("second init");
        assert!(columns(&conn, "dean_lists").contains(&"source_sha256".to_string()));
        assert!(columns(&conn, "dean_list_students").contains(&"registered_credits".to_string()));
    }

    #[test]
    fn deleting_a_list_cascades_to_students() {
        let conn = open_in_memory().expect("open");
        conn.execute_batch(
            "INSERT INTO dean_lists(id, semester, year, created_at) VALUES('d1', 'fall', 2024, 'now');
             INSERT INTO dean_list_students(id, dean_list_id, semester, year, student_id, student_name, created_at)
             VALUES('s1', 'd1', 'fall', 2024, '12345', 'A', 'now');
             DELETE FROM dean_lists WHERE id = 'd1';",
        )
        .expect("seed");
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM dean_list_students", [], |r| r.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }
}

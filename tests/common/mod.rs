#![allow(dead_code)]

use deanlist::{Cell, Grid};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

pub fn t(s: &str) -> Cell {
    Cell::text(s)
}

pub fn grid(rows: &[&[&str]]) -> Grid {
    Grid::new(
        rows.iter()
            .map(|r| r.iter().map(|c| if c.is_empty() { Cell::Empty } else { t(c) }).collect())
            .collect(),
    )
}

pub fn count(conn: &rusqlite::Connection, sql: &str) -> i64 {
    conn.query_row(sql, [], |r| r.get(0)).expect("count query")
}

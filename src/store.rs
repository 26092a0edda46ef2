use std::fmt;

use chrono::Utc;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Semester {
    Fall,
    Spring,
}

impl Semester {
    pub fn as_str(self) -> &'static str {
        match self {
            Semester::Fall => "fall",
            Semester::Spring => "spring",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fall" => Ok(Semester::Fall),
            "spring" => Ok(Semester::Spring),
            other => Err(ImportError::InvalidInput(format!(
                "semester must be fall or spring, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for Semester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One semester/year publication.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: String,
    pub semester: Semester,
    pub year: i64,
    pub source_file: Option<String>,
    pub source_sha256: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub dean_list_id: String,
    pub semester: Semester,
    pub year: i64,
    pub student_id: String,
    pub student_name: String,
    pub major: String,
    pub gpa: f64,
    pub passed_credits: i64,
    pub registered_credits: i64,
}

/// Values extracted from one spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub student_id: String,
    pub student_name: String,
    pub major: String,
    pub gpa: f64,
    pub passed_credits: i64,
    pub registered_credits: i64,
}

/// Where an archived source workbook ended up.
#[derive(Debug, Clone, Default)]
pub struct SourceRef {
    pub path: Option<String>,
    pub sha256: Option<String>,
}

pub(crate) const STUDENT_COLUMNS: &str = "s.id, s.dean_list_id, s.semester, s.year, s.student_id, \
     s.student_name, s.major, s.gpa, s.passed_credits, s.registered_credits";

fn semester_from_sql(s: String) -> rusqlite::Result<Semester> {
    Semester::parse(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn student_from_row(r: &Row<'_>) -> rusqlite::Result<StudentRecord> {
    Ok(StudentRecord {
        id: r.get(0)?,
        dean_list_id: r.get(1)?,
        semester: semester_from_sql(r.get(2)?)?,
        year: r.get(3)?,
        student_id: r.get(4)?,
        student_name: r.get(5)?,
        major: r.get(6)?,
        gpa: r.get(7)?,
        passed_credits: r.get(8)?,
        registered_credits: r.get(9)?,
    })
}

fn batch_from_row(r: &Row<'_>) -> rusqlite::Result<Batch> {
    Ok(Batch {
        id: r.get(0)?,
        semester: semester_from_sql(r.get(1)?)?,
        year: r.get(2)?,
        source_file: r.get(3)?,
        source_sha256: r.get(4)?,
        created_at: r.get(5)?,
    })
}

const BATCH_COLUMNS: &str = "id, semester, year, source_file, source_sha256, created_at";

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn find_batch(conn: &Connection, semester: Semester, year: i64) -> Result<Option<Batch>> {
    let sql = format!("SELECT {BATCH_COLUMNS} FROM dean_lists WHERE semester = ? AND year = ?");
    Ok(conn
        .query_row(&sql, (semester.as_str(), year), batch_from_row)
        .optional()?)
}

pub fn get_batch(conn: &Connection, id: &str) -> Result<Batch> {
    let sql = format!("SELECT {BATCH_COLUMNS} FROM dean_lists WHERE id = ?");
    conn.query_row(&sql, [id], batch_from_row)
        .optional()?
        .ok_or_else(|| ImportError::NotFound(format!("dean's list {id}")))
}

/// Create the batch for `(semester, year)`; a second call for the same pair
/// fails with [`ImportError::DuplicateBatch`].
pub fn create_batch(
    conn: &Connection,
    semester: Semester,
    year: i64,
    source: &SourceRef,
) -> Result<Batch> {
    let duplicate = || ImportError::DuplicateBatch {
        semester: semester.to_string(),
        year,
    };
    if find_batch(conn, semester, year)?.is_some() {
        return Err(duplicate());
    }

    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        semester,
        year,
        source_file: source.path.clone(),
        source_sha256: source.sha256.clone(),
        created_at: Utc::now().to_rfc3339(),
    };
    let res = conn.execute(
        "INSERT INTO dean_lists(id, semester, year, source_file, source_sha256, created_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &batch.id,
            batch.semester.as_str(),
            batch.year,
            &batch.source_file,
            &batch.source_sha256,
            &batch.created_at,
        ),
    );
    match res {
        Ok(_) => {
            info!(batch = %batch.id, %semester, year, "dean's list created");
            Ok(batch)
        }
        // Lost a race with another writer for the same pair.
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            Err(duplicate())
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    #[serde(flatten)]
    pub batch: Batch,
    pub student_count: i64,
}

/// All batches, newest year first.
pub fn list_batches(conn: &Connection) -> Result<Vec<BatchSummary>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, d.semester, d.year, d.source_file, d.source_sha256, d.created_at,
           (SELECT COUNT(*) FROM dean_list_students s WHERE s.dean_list_id = d.id) AS student_count
         FROM dean_lists d
         ORDER BY d.year DESC, d.semester",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(BatchSummary {
                batch: batch_from_row(r)?,
                student_count: r.get(6)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Delete a batch and, through the foreign key, all of its records.
pub fn delete_batch(conn: &Connection, id: &str) -> Result<usize> {
    let students = count_students_in_batch(conn, id)?;
    let n = conn.execute("DELETE FROM dean_lists WHERE id = ?", [id])?;
    if n == 0 {
        return Err(ImportError::NotFound(format!("dean's list {id}")));
    }
    info!(batch = %id, students, "dean's list deleted");
    Ok(students as usize)
}

pub fn insert_student(conn: &Connection, batch: &Batch, s: &NewStudent) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO dean_list_students(
            id, dean_list_id, semester, year, student_id, student_name, major,
            gpa, passed_credits, registered_credits, created_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &batch.id,
            batch.semester.as_str(),
            batch.year,
            &s.student_id,
            &s.student_name,
            &s.major,
            round2(s.gpa),
            s.passed_credits,
            s.registered_credits,
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(id)
}

pub fn count_students(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM dean_list_students", [], |r| r.get(0))?)
}

pub fn count_students_in_batch(conn: &Connection, batch_id: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM dean_list_students WHERE dean_list_id = ?",
        [batch_id],
        |r| r.get(0),
    )?)
}

pub fn students_in_batch(conn: &Connection, batch_id: &str) -> Result<Vec<StudentRecord>> {
    let sql = format!(
        "SELECT {STUDENT_COLUMNS} FROM dean_list_students s WHERE s.dean_list_id = ? ORDER BY s.rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([batch_id], student_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Delete one record by primary key. `Ok(false)` means it was already gone.
pub fn delete_student(conn: &Connection, id: &str) -> Result<bool> {
    let n = conn.execute("DELETE FROM dean_list_students WHERE id = ?", [id])?;
    Ok(n > 0)
}

/// Remove every record of one semester/year, one row at a time.
/// Failures on single rows are logged and skipped.
pub fn delete_batch_students(conn: &Connection, semester: Semester, year: i64) -> Result<usize> {
    let mut stmt =
        conn.prepare("SELECT id FROM dean_list_students WHERE semester = ? AND year = ?")?;
    let ids = stmt
        .query_map((semester.as_str(), year), |r| r.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    if ids.is_empty() {
        info!(%semester, year, "no records to delete");
        return Ok(0);
    }

    let mut deleted = 0;
    for id in &ids {
        match delete_student(conn, id) {
            Ok(true) => deleted += 1,
            Ok(false) => warn!(record = %id, "record already deleted"),
            Err(e) => warn!(record = %id, error = %e, "failed to delete record"),
        }
    }
    info!(%semester, year, found = ids.len(), deleted, "dean's list records deleted");
    Ok(deleted)
}

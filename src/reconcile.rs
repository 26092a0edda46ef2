//! Deletion of structurally invalid student records.
//!
//! Two entry points share the same placeholder checks:
//! - [`reconcile`] runs after every import,
//! - [`cleanup`] is operator-driven, scoped by year, and also enforces a
//!   minimum number of digits in the student ID.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ImportError, Result};
use crate::normalize::digit_count;
use crate::store::{self, StudentRecord, STUDENT_COLUMNS};

const PLACEHOLDERS: &[&str] = &["nan", "none", "null"];
const LOGGED_EXAMPLES: usize = 5;
pub const DEFAULT_MIN_ID_DIGITS: u32 = 5;

/// Whitespace-only values are empty. The placeholder comparison is on the
/// raw value, so `" null "` is kept.
fn placeholder_problem(value: &str, field: &str) -> Option<String> {
    if value.trim().is_empty() {
        return Some(format!("empty {field}"));
    }
    let lower = value.to_lowercase();
    if PLACEHOLDERS.contains(&lower.as_str()) {
        return Some(format!("invalid {field} (nan/none/null)"));
    }
    None
}

/// Reasons a record fails the basic checks. With `min_id_digits` set, IDs
/// with fewer digit characters are also rejected.
pub fn invalid_reasons(name: &str, student_id: &str, min_id_digits: Option<u32>) -> Vec<String> {
    let mut reasons = Vec::new();
    if let Some(r) = placeholder_problem(name, "student_name") {
        reasons.push(r);
    }
    match placeholder_problem(student_id, "student_id") {
        Some(r) => reasons.push(r),
        None => {
            if let Some(min) = min_id_digits {
                let n = digit_count(student_id);
                if n < min as usize {
                    reasons.push(format!(
                        "student_id too short ({n} digits, need at least {min})"
                    ));
                }
            }
        }
    }
    reasons
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidRecord {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub semester: String,
    pub year: i64,
    pub reasons: Vec<String>,
}

impl InvalidRecord {
    fn new(r: &StudentRecord, reasons: Vec<String>) -> Self {
        Self {
            id: r.id.clone(),
            student_id: r.student_id.clone(),
            student_name: r.student_name.clone(),
            semester: r.semester.to_string(),
            year: r.year,
            reasons,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub total: usize,
    pub deleted: usize,
    pub remaining: usize,
    pub invalid: Vec<InvalidRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    All,
    Batch(String),
}

fn load_records(conn: &Connection, scope: &Scope) -> Result<Vec<StudentRecord>> {
    let rows = match scope {
        Scope::All => {
            let sql = format!("SELECT {STUDENT_COLUMNS} FROM dean_list_students s ORDER BY s.rowid");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], store::student_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
        Scope::Batch(id) => store::students_in_batch(conn, id)?,
    };
    Ok(rows)
}

fn records_for_year(conn: &Connection, year: i64) -> Result<Vec<StudentRecord>> {
    let sql = format!(
        "SELECT {STUDENT_COLUMNS} FROM dean_list_students s WHERE s.year = ? ORDER BY s.rowid"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([year], store::student_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn log_examples(invalid: &[InvalidRecord]) {
    for r in invalid.iter().take(LOGGED_EXAMPLES) {
        info!(
            record = %r.id,
            name = %r.student_name,
            student_id = %r.student_id,
            semester = %r.semester,
            year = r.year,
            reasons = %r.reasons.join(", "),
            "invalid record"
        );
    }
    if invalid.len() > LOGGED_EXAMPLES {
        info!("... and {} more", invalid.len() - LOGGED_EXAMPLES);
    }
}

/// Delete each listed record; failures and already-deleted rows are logged
/// and not counted.
fn delete_records(conn: &Connection, invalid: &[InvalidRecord]) -> usize {
    let mut deleted = 0;
    for r in invalid {
        match store::delete_student(conn, &r.id) {
            Ok(true) => deleted += 1,
            Ok(false) => warn!(record = %r.id, "record not found (may have been already deleted)"),
            Err(e) => warn!(record = %r.id, error = %e, "error deleting record"),
        }
    }
    deleted
}

/// Post-import pass: remove records whose name or ID is empty or a
/// `nan`/`none`/`null` placeholder.
pub fn reconcile(conn: &Connection, scope: &Scope) -> Result<ReconcileSummary> {
    let records = load_records(conn, scope)?;
    let total = records.len();
    info!(?scope, total, "reconciling dean's list records");
    if total == 0 {
        return Ok(ReconcileSummary::default());
    }

    let invalid: Vec<InvalidRecord> = records
        .iter()
        .filter_map(|r| {
            let reasons = invalid_reasons(&r.student_name, &r.student_id, None);
            (!reasons.is_empty()).then(|| InvalidRecord::new(r, reasons))
        })
        .collect();

    let deleted = if invalid.is_empty() {
        0
    } else {
        log_examples(&invalid);
        delete_records(conn, &invalid)
    };

    let remaining = match scope {
        Scope::All => store::count_students(conn)?,
        Scope::Batch(id) => store::count_students_in_batch(conn, id)?,
    } as usize;

    info!(total, deleted, remaining, "reconcile complete");
    Ok(ReconcileSummary {
        total,
        deleted,
        remaining,
        invalid,
    })
}

/// System-wide reconciliation.
pub fn reconcile_all(conn: &Connection) -> Result<ReconcileSummary> {
    reconcile(conn, &Scope::All)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum YearSelection {
    Years(Vec<i64>),
    /// Every stored year strictly below the threshold.
    ExcludeFrom(i64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupRequest {
    pub selection: YearSelection,
    pub dry_run: bool,
    pub min_id_digits: u32,
}

impl CleanupRequest {
    pub fn new(selection: YearSelection, dry_run: bool) -> Self {
        Self {
            selection,
            dry_run,
            min_id_digits: DEFAULT_MIN_ID_DIGITS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearCleanup {
    pub year: i64,
    pub checked: usize,
    pub invalid: Vec<InvalidRecord>,
    /// Records removed, or in a dry run the records that would be.
    pub deleted: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub years: Vec<i64>,
    pub per_year: Vec<YearCleanup>,
    pub total_checked: usize,
    pub total_deleted: usize,
    pub dry_run: bool,
}

fn stored_years_below(conn: &Connection, threshold: i64) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT year FROM dean_list_students WHERE year < ? ORDER BY year")?;
    let years = stmt
        .query_map([threshold], |r| r.get(0))?
        .collect::<rusqlite::Result<Vec<i64>>>()?;
    Ok(years)
}

/// Operator cleanup of selected years.
pub fn cleanup(conn: &Connection, req: &CleanupRequest) -> Result<CleanupReport> {
    let mut years = match &req.selection {
        YearSelection::Years(v) => {
            if v.is_empty() {
                return Err(ImportError::InvalidInput(
                    "specify at least one year or an exclude-from threshold".into(),
                ));
            }
            info!(years = ?v, "cleaning specified years");
            v.clone()
        }
        YearSelection::ExcludeFrom(n) => {
            let v = stored_years_below(conn, *n)?;
            info!(threshold = n, years = ?v, "cleaning years below threshold");
            v
        }
    };
    years.sort_unstable();
    years.dedup();

    let mut per_year = Vec::with_capacity(years.len());
    let mut total_checked = 0;
    let mut total_deleted = 0;

    for &year in &years {
        let records = records_for_year(conn, year)?;
        let checked = records.len();
        total_checked += checked;
        if checked == 0 {
            info!(year, "no records found");
            per_year.push(YearCleanup {
                year,
                checked,
                invalid: Vec::new(),
                deleted: 0,
            });
            continue;
        }

        let invalid: Vec<InvalidRecord> = records
            .iter()
            .filter_map(|r| {
                let reasons =
                    invalid_reasons(&r.student_name, &r.student_id, Some(req.min_id_digits));
                (!reasons.is_empty()).then(|| InvalidRecord::new(r, reasons))
            })
            .collect();

        let deleted = if invalid.is_empty() {
            info!(year, checked, "no invalid records");
            0
        } else {
            info!(year, checked, invalid = invalid.len(), "invalid records found");
            log_examples(&invalid);
            if req.dry_run {
                info!(year, would_delete = invalid.len(), "dry run");
                invalid.len()
            } else {
                let n = delete_records(conn, &invalid);
                info!(year, deleted = n, "invalid records deleted");
                n
            }
        };
        total_deleted += deleted;
        per_year.push(YearCleanup {
            year,
            checked,
            invalid,
            deleted,
        });
    }

    info!(
        years = ?years,
        total_checked,
        total_deleted,
        dry_run = req.dry_run,
        "cleanup complete"
    );
    Ok(CleanupReport {
        years,
        per_year,
        total_checked,
        total_deleted,
        dry_run: req.dry_run,
    })
}

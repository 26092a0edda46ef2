//! Spreadsheet to `dean_list_students` pipeline.
//!
//! Order of work:
//! 1. locate the header row,
//! 2. bind columns,
//! 3. create the batch,
//! 4. insert one record per usable row,
//! 5. reconcile.
//!
//! Steps 1 and 2 run before anything is written, so a sheet without a header
//! or without name/ID columns leaves the database untouched. There is no
//! transaction around step 4: rows written before a failure stay written.

use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::archive;
use crate::columns::{self, ColumnMap, Field};
use crate::config::ReconcileScope;
use crate::error::{ImportError, Result};
use crate::reconcile::{self, ReconcileSummary, Scope};
use crate::sheet::{self, Cell, Grid};
use crate::store::{self, Batch, NewStudent, Semester, SourceRef};

const DEBUG_ROWS: usize = 3;

/// Header position and column bindings for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPlan {
    pub header_row_index: usize,
    pub labels: Vec<String>,
    pub columns: ColumnMap,
}

pub fn plan(grid: &Grid) -> Result<ImportPlan> {
    let header_row_index = sheet::locate_header_row(grid).ok_or(ImportError::HeaderNotFound)?;
    let labels = sheet::header_labels(grid, header_row_index);
    let columns = columns::resolve_all(&labels)?;

    for field in Field::ALL {
        match columns.get(field) {
            Some(i) => info!(field = field.label(), column = %labels[i], "column bound"),
            None => info!(field = field.label(), "column not found, using default"),
        }
    }
    Ok(ImportPlan {
        header_row_index,
        labels,
        columns,
    })
}

fn text_at(grid: &Grid, row: usize, col: Option<usize>) -> String {
    col.map(|c| grid.cell(row, c).as_text()).unwrap_or_default()
}

/// GPA as a float; missing or unparseable values read as `0.0`.
pub fn coerce_gpa(cell: &Cell) -> f64 {
    let v = match cell {
        Cell::Number(n) => *n,
        Cell::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        Cell::Bool(_) | Cell::Empty => 0.0,
    };
    if v.is_finite() {
        store::round2(v)
    } else {
        0.0
    }
}

/// Credit counts as integers; fractional values are truncated and anything
/// unparseable reads as `0`.
pub fn coerce_credits(cell: &Cell) -> i64 {
    let as_int = |f: f64| if f.is_finite() { f.trunc() as i64 } else { 0 };
    match cell {
        Cell::Number(n) => as_int(*n),
        Cell::Text(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().map(as_int))
                .unwrap_or(0)
        }
        Cell::Bool(_) | Cell::Empty => 0,
    }
}

/// Extract the record for one data row, or `None` when name or ID is blank.
pub fn extract_row(grid: &Grid, row: usize, columns: &ColumnMap) -> Option<NewStudent> {
    let student_name = text_at(grid, row, Some(columns.student_name));
    let student_id = text_at(grid, row, Some(columns.student_id));
    if student_name.is_empty() || student_id.is_empty() {
        return None;
    }
    let numeric = |col: Option<usize>| col.map(|c| grid.cell(row, c));

    Some(NewStudent {
        student_id,
        student_name,
        major: text_at(grid, row, columns.major),
        gpa: numeric(columns.gpa).map(coerce_gpa).unwrap_or(0.0),
        passed_credits: numeric(columns.passed_credits)
            .map(coerce_credits)
            .unwrap_or(0),
        registered_credits: numeric(columns.registered_credits)
            .map(coerce_credits)
            .unwrap_or(0),
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestStats {
    pub rows_processed: usize,
    pub students_saved: usize,
    pub rows_skipped: usize,
    pub row_errors: usize,
}

/// Insert every usable row after the header into `batch`.
pub fn ingest_rows(conn: &Connection, grid: &Grid, plan: &ImportPlan, batch: &Batch) -> IngestStats {
    let mut stats = IngestStats::default();
    let first = plan.header_row_index + 1;

    for (n, row) in (first..grid.row_count()).enumerate() {
        stats.rows_processed += 1;
        let Some(student) = extract_row(grid, row, &plan.columns) else {
            debug!(row, "skipping row without name or id");
            stats.rows_skipped += 1;
            continue;
        };
        if n < DEBUG_ROWS {
            debug!(row, ?student, "row data");
        }
        match store::insert_student(conn, batch, &student) {
            Ok(_) => stats.students_saved += 1,
            Err(e) => {
                stats.row_errors += 1;
                warn!(
                    row,
                    name = %student.student_name,
                    student_id = %student.student_id,
                    error = %e,
                    "error saving student"
                );
            }
        }
    }

    info!(
        batch = %batch.id,
        rows_processed = stats.rows_processed,
        saved = stats.students_saved,
        skipped = stats.rows_skipped,
        errors = stats.row_errors,
        "rows ingested"
    );
    stats
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub reconcile_scope: Option<ReconcileScope>,
    pub source: SourceRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub batch_id: String,
    pub semester: Semester,
    pub year: i64,
    pub header_row_index: usize,
    #[serde(flatten)]
    pub stats: IngestStats,
    pub reconcile: ReconcileSummary,
}

impl ImportReport {
    pub fn rows_processed(&self) -> usize {
        self.stats.rows_processed
    }

    pub fn students_saved(&self) -> usize {
        self.stats.students_saved
    }
}

/// Import an in-memory grid as the dean's list for `(semester, year)`.
pub fn import_grid(
    conn: &Connection,
    grid: &Grid,
    semester: Semester,
    year: i64,
    opts: &ImportOptions,
) -> Result<ImportReport> {
    info!(%semester, year, rows = grid.row_count(), "importing dean's list");
    let plan = plan(grid)?;
    let batch = store::create_batch(conn, semester, year, &opts.source)?;
    let stats = ingest_rows(conn, grid, &plan, &batch);

    let scope = match opts.reconcile_scope.unwrap_or(ReconcileScope::All) {
        ReconcileScope::All => Scope::All,
        ReconcileScope::Batch => Scope::Batch(batch.id.clone()),
    };
    let reconcile = reconcile::reconcile(conn, &scope)?;

    Ok(ImportReport {
        batch_id: batch.id,
        semester,
        year,
        header_row_index: plan.header_row_index,
        stats,
        reconcile,
    })
}

/// Read a workbook from disk and import it.
///
/// With `archive_dir` set, the file is first copied there under the
/// `{semester}{year}dean list.{ext}` name and fingerprinted on the batch.
pub fn import_workbook(
    conn: &Connection,
    path: &Path,
    semester: Semester,
    year: i64,
    reconcile_scope: Option<ReconcileScope>,
    archive_dir: Option<&Path>,
) -> Result<ImportReport> {
    if archive::workbook_extension(path).is_none() {
        return Err(ImportError::InvalidInput(format!(
            "please upload a valid Excel file ({}): {}",
            archive::WORKBOOK_EXTENSIONS.join(", "),
            path.display()
        )));
    }
    let grid = sheet::read_workbook(path)?;
    // Validate before archiving so rejected uploads leave nothing behind.
    plan(&grid)?;
    if store::find_batch(conn, semester, year)?.is_some() {
        return Err(ImportError::DuplicateBatch {
            semester: semester.to_string(),
            year,
        });
    }

    let source = match archive_dir {
        Some(dir) => archive::archive_workbook(path, dir, semester, year)
            .map_err(|e| ImportError::Unreadable(format!("{e:#}")))?,
        None => SourceRef::default(),
    };
    import_grid(
        conn,
        &grid,
        semester,
        year,
        &ImportOptions {
            reconcile_scope,
            source,
        },
    )
}

//! Read-side queries over imported dean's lists: per-term rosters grouped by
//! major, student search with rankings, and the latest-list eligibility check.

use std::collections::BTreeMap;

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::error::Result;
use crate::store::{self, Semester, StudentRecord, STUDENT_COLUMNS};

pub const UNKNOWN_MAJOR: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MajorGroup {
    pub major: String,
    pub students: Vec<StudentRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub semester: Semester,
    pub year: i64,
    pub majors: Vec<String>,
    pub groups: Vec<MajorGroup>,
    pub total_students: usize,
}

fn query_students(
    conn: &Connection,
    filter: &str,
    order: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<StudentRecord>> {
    let sql = format!("SELECT {STUDENT_COLUMNS} FROM dean_list_students s WHERE {filter} ORDER BY {order}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, store::student_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Students of one term grouped by major, best GPA first within a major.
///
/// A `major` filter that matches no group yields an empty grouping; the
/// `majors` list is always the full set for the term.
pub fn roster(
    conn: &Connection,
    semester: Semester,
    year: i64,
    major: Option<&str>,
) -> Result<Roster> {
    let students = query_students(
        conn,
        "s.semester = ? AND s.year = ?",
        "TRIM(s.major), s.gpa DESC, s.passed_credits DESC, s.student_name",
        (semester.as_str(), year),
    )?;

    let mut majors: Vec<String> = students
        .iter()
        .map(|s| s.major.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    majors.sort();
    majors.dedup();

    let mut grouped: BTreeMap<String, Vec<StudentRecord>> = BTreeMap::new();
    for s in students {
        let key = match s.major.trim() {
            "" => UNKNOWN_MAJOR.to_string(),
            m => m.to_string(),
        };
        grouped.entry(key).or_default().push(s);
    }

    if let Some(wanted) = major.map(str::trim).filter(|m| !m.is_empty()) {
        grouped.retain(|k, _| k == wanted);
    }

    let groups: Vec<MajorGroup> = grouped
        .into_iter()
        .map(|(major, students)| MajorGroup { major, students })
        .collect();
    let total_students = groups.iter().map(|g| g.students.len()).sum();

    Ok(Roster {
        semester,
        year,
        majors,
        groups,
        total_students,
    })
}

/// A student's standing in one term.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub student: StudentRecord,
    pub ranking: usize,
    pub total_students: usize,
    pub major_ranking: usize,
    pub total_students_in_major: usize,
    pub percentage_rank: f64,
    pub major_percentage_rank: f64,
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn percentage(rank: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(rank as f64 / total as f64 * 100.0)
}

/// 1-based position of `student_id` in an already ordered list.
fn position_of(list: &[StudentRecord], student_id: &str) -> usize {
    list.iter()
        .position(|s| s.student_id == student_id)
        .map(|i| i + 1)
        .unwrap_or(1)
}

fn rank_in_term(conn: &Connection, student: StudentRecord) -> Result<Ranking> {
    let everyone = query_students(
        conn,
        "s.semester = ? AND s.year = ?",
        "s.gpa DESC, s.student_name",
        (student.semester.as_str(), student.year),
    )?;
    let same_major = query_students(
        conn,
        "s.semester = ? AND s.year = ? AND TRIM(s.major) = ?",
        "s.gpa DESC, s.student_name",
        (student.semester.as_str(), student.year, student.major.trim()),
    )?;

    let ranking = position_of(&everyone, &student.student_id);
    let major_ranking = position_of(&same_major, &student.student_id);
    Ok(Ranking {
        ranking,
        total_students: everyone.len(),
        major_ranking,
        total_students_in_major: same_major.len(),
        percentage_rank: percentage(ranking, everyone.len()),
        major_percentage_rank: percentage(major_ranking, same_major.len()),
        student,
    })
}

/// One ranking per term the given records appear in, oldest term first.
pub fn rankings(conn: &Connection, records: Vec<StudentRecord>) -> Result<Vec<Ranking>> {
    let mut seen: Vec<(i64, Semester)> = Vec::new();
    let mut out = Vec::new();
    for r in records {
        let key = (r.year, r.semester);
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        out.push(rank_in_term(conn, r)?);
    }
    Ok(out)
}

/// Exact student ID lookup across every term.
pub fn search_by_id(conn: &Connection, student_id: &str) -> Result<Vec<Ranking>> {
    let records = query_students(
        conn,
        "s.student_id = ?",
        "s.year, s.semester",
        [student_id.trim()],
    )?;
    rankings(conn, records)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameMatch {
    pub student_name: String,
    pub student_id: String,
    pub appearances: usize,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "results", rename_all = "camelCase")]
pub enum NameSearch {
    /// Several distinct names matched; the caller should ask which one.
    Multiple(Vec<NameMatch>),
    Rankings(Vec<Ranking>),
}

/// Every whitespace-separated word of `query` must occur in the name,
/// case-insensitively and in any order.
pub fn search_by_name(conn: &Connection, query: &str) -> Result<NameSearch> {
    let words: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
    if words.is_empty() {
        return Ok(NameSearch::Rankings(Vec::new()));
    }

    let candidates = query_students(conn, "1 = 1", "s.student_name, s.year, s.semester", [])?;
    let matches: Vec<StudentRecord> = candidates
        .into_iter()
        .filter(|s| {
            let name = s.student_name.to_lowercase();
            words.iter().all(|w| name.contains(w.as_str()))
        })
        .collect();

    let mut by_name: BTreeMap<String, Vec<StudentRecord>> = BTreeMap::new();
    for s in &matches {
        by_name.entry(s.student_name.clone()).or_default().push(s.clone());
    }

    if by_name.len() > 1 {
        let list = by_name
            .into_iter()
            .map(|(name, records)| {
                let mut terms: Vec<String> = records
                    .iter()
                    .map(|r| format!("{} {}", r.semester, r.year))
                    .collect();
                terms.sort();
                terms.dedup();
                NameMatch {
                    student_id: records[0].student_id.clone(),
                    appearances: records.len(),
                    student_name: name,
                    terms,
                }
            })
            .collect();
        return Ok(NameSearch::Multiple(list));
    }

    let mut ordered = matches;
    ordered.sort_by(|a, b| (a.year, a.semester.as_str()).cmp(&(b.year, b.semester.as_str())));
    Ok(NameSearch::Rankings(rankings(conn, ordered)?))
}

/// The most recent term that has any imported students.
pub fn latest_term(conn: &Connection) -> Result<Option<(Semester, i64)>> {
    let row = conn
        .query_row(
            "SELECT semester, year FROM dean_list_students ORDER BY year DESC, semester DESC LIMIT 1",
            [],
            |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
        )
        .optional()?;
    match row {
        Some((semester, year)) => Ok(Some((Semester::parse(&semester)?, year))),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Eligibility {
    pub latest_semester: Option<Semester>,
    pub latest_year: Option<i64>,
    pub on_latest_list: bool,
}

/// Whether `student_id` appears on the most recently published list.
pub fn eligibility(conn: &Connection, student_id: &str) -> Result<Eligibility> {
    let Some((semester, year)) = latest_term(conn)? else {
        return Ok(Eligibility {
            latest_semester: None,
            latest_year: None,
            on_latest_list: false,
        });
    };
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM dean_list_students WHERE student_id = ? AND semester = ? AND year = ? LIMIT 1",
            (student_id.trim(), semester.as_str(), year),
            |r| r.get(0),
        )
        .optional()?;
    Ok(Eligibility {
        latest_semester: Some(semester),
        latest_year: Some(year),
        on_latest_list: found.is_some(),
    })
}

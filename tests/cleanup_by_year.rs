mod common;

use common::count;
use deanlist::store::{self, Batch, NewStudent, SourceRef};
use deanlist::{cleanup, db, CleanupRequest, ImportError, Semester, YearSelection};
use rusqlite::Connection;

fn add(conn: &Connection, batch: &Batch, id: &str, name: &str) {
    store::insert_student(
        conn,
        batch,
        &NewStudent {
            student_id: id.into(),
            student_name: name.into(),
            major: "ACC".into(),
            gpa: 3.5,
            passed_credits: 60,
            registered_credits: 15,
        },
    )
    .expect("insert");
}

fn seeded() -> Connection {
    let conn = db::open_in_memory().expect("db");
    let b2018 = store::create_batch(&conn, Semester::Fall, 2018, &SourceRef::default()).expect("batch");
    let b2019 = store::create_batch(&conn, Semester::Spring, 2019, &SourceRef::default()).expect("batch");
    let b2024 = store::create_batch(&conn, Semester::Fall, 2024, &SourceRef::default()).expect("batch");

    add(&conn, &b2018, "nan", "Old Placeholder");
    add(&conn, &b2018, "20181111", "Kept 2018");

    add(&conn, &b2019, "1234", "Short Id");
    add(&conn, &b2019, "ST-12345", "Prefixed Id");
    add(&conn, &b2019, "20190001", "null");
    add(&conn, &b2019, "20190002", "Valid Student");

    add(&conn, &b2024, "999", "Recent Short Id");
    conn
}

fn students(conn: &Connection) -> i64 {
    count(conn, "SELECT COUNT(*) FROM dean_list_students")
}

#[test]
fn dry_run_reports_without_deleting() {
    let conn = seeded();
    let before = students(&conn);

    let report = cleanup(
        &conn,
        &CleanupRequest::new(YearSelection::Years(vec![2019]), true),
    )
    .expect("dry run");
    assert!(report.dry_run);
    assert_eq!(report.years, vec![2019]);
    assert_eq!(report.total_checked, 4);
    assert_eq!(report.total_deleted, 2);
    assert_eq!(students(&conn), before);
}

#[test]
fn real_run_deletes_exactly_the_reported_records() {
    let conn = seeded();
    let before = students(&conn);

    let report = cleanup(
        &conn,
        &CleanupRequest::new(YearSelection::Years(vec![2019]), false),
    )
    .expect("cleanup");
    assert_eq!(report.total_deleted, 2);
    assert_eq!(students(&conn), before - report.total_deleted as i64);

    let ids: Vec<String> = {
        let mut stmt = conn
            .prepare("SELECT student_id FROM dean_list_students WHERE year = 2019 ORDER BY student_id")
            .expect("prepare");
        stmt.query_map([], |r| r.get(0))
            .expect("query")
            .collect::<rusqlite::Result<_>>()
            .expect("rows")
    };
    assert_eq!(ids, vec!["20190002", "ST-12345"]);

    let year = &report.per_year[0];
    let mut reasons: Vec<&str> = year
        .invalid
        .iter()
        .flat_map(|r| r.reasons.iter().map(String::as_str))
        .collect();
    reasons.sort_unstable();
    assert_eq!(
        reasons,
        vec![
            "invalid student_name (nan/none/null)",
            "student_id too short (4 digits, need at least 5)",
        ]
    );

    // Other years are untouched, including the short id in 2024.
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM dean_list_students WHERE year = 2024"), 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM dean_list_students WHERE year = 2018"), 2);
}

#[test]
fn exclude_from_selects_every_older_stored_year() {
    let conn = seeded();

    let report = cleanup(
        &conn,
        &CleanupRequest::new(YearSelection::ExcludeFrom(2024), false),
    )
    .expect("cleanup");
    assert_eq!(report.years, vec![2018, 2019]);
    assert_eq!(report.per_year.len(), 2);
    assert_eq!(report.per_year[0].deleted, 1);
    assert_eq!(report.per_year[1].deleted, 2);
    assert_eq!(report.total_checked, 6);
    assert_eq!(report.total_deleted, 3);
    assert_eq!(students(&conn), 4);
}

#[test]
fn years_without_records_are_reported_empty() {
    let conn = seeded();
    let report = cleanup(
        &conn,
        &CleanupRequest::new(YearSelection::Years(vec![2030, 2030]), false),
    )
    .expect("cleanup");
    assert_eq!(report.years, vec![2030]);
    assert_eq!(report.per_year[0].checked, 0);
    assert_eq!(report.total_deleted, 0);
}

#[test]
fn min_digits_threshold_is_configurable() {
    let conn = seeded();
    let mut req = CleanupRequest::new(YearSelection::Years(vec![2024]), true);
    assert_eq!(cleanup(&conn, &req).expect("default").total_deleted, 1);

    req.min_id_digits = 3;
    assert_eq!(cleanup(&conn, &req).expect("relaxed").total_deleted, 0);
}

#[test]
fn empty_selection_is_rejected() {
    let conn = seeded();
    let err = cleanup(&conn, &CleanupRequest::new(YearSelection::Years(vec![]), false))
        .expect_err("empty");
    assert!(matches!(err, ImportError::InvalidInput(_)), "{err:?}");
    assert_eq!(err.code(), "bad_params");
}

#[test]
fn failing_delete_is_skipped_and_not_counted() {
    let conn = seeded();
    conn.execute_batch(
        "CREATE TRIGGER keep_short_ids BEFORE DELETE ON dean_list_students
         WHEN OLD.student_id = '1234'
         BEGIN SELECT RAISE(ABORT, 'protected'); END;",
    )
    .expect("trigger");

    let report = cleanup(
        &conn,
        &CleanupRequest::new(YearSelection::Years(vec![2019]), false),
    )
    .expect("cleanup");
    assert_eq!(report.per_year[0].invalid.len(), 2);
    assert_eq!(report.total_deleted, 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM dean_list_students WHERE year = 2019"), 3);
}

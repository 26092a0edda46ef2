mod common;

use common::{count, temp_dir};
use deanlist::store::{self, NewStudent, SourceRef};
use deanlist::{db, Semester};
use std::path::Path;
use std::process::{Command, Output};

fn seed(workspace: &Path) {
    let conn = db::open_db(workspace).expect("open db");
    let batch = store::create_batch(&conn, Semester::Spring, 2019, &SourceRef::default()).expect("batch");
    for (id, name) in [
        ("20190001", "Valid Student"),
        ("1234", "Short Id"),
        ("ST-12345", "Prefixed Id"),
        ("none", "Placeholder Id"),
    ] {
        store::insert_student(
            &conn,
            &batch,
            &NewStudent {
                student_id: id.into(),
                student_name: name.into(),
                major: "ACC".into(),
                gpa: 3.6,
                passed_credits: 70,
                registered_credits: 15,
            },
        )
        .expect("insert");
    }
}

fn cli(workspace: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_deanlist-cli"))
        .arg("--workspace")
        .arg(workspace)
        .arg("--json")
        .args(args)
        .env("LOG_LEVEL", "error")
        .output()
        .expect("run deanlist-cli")
}

fn json_stdout(out: &Output) -> serde_json::Value {
    assert!(
        out.status.success(),
        "cli failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    serde_json::from_slice(&out.stdout).expect("parse cli json")
}

fn students(workspace: &Path) -> i64 {
    let conn = db::open_db(workspace).expect("open db");
    count(&conn, "SELECT COUNT(*) FROM dean_list_students")
}

#[test]
fn cleanup_dry_run_then_delete() {
    let workspace = temp_dir("deanlist-cli-cleanup");
    seed(&workspace);
    assert_eq!(students(&workspace), 4);

    let dry = json_stdout(&cli(&workspace, &["cleanup", "--years", "2019", "--dry-run"]));
    assert_eq!(dry["dryRun"], serde_json::json!(true));
    assert_eq!(dry["totalChecked"], serde_json::json!(4));
    assert_eq!(dry["totalDeleted"], serde_json::json!(2));
    assert_eq!(students(&workspace), 4);

    let real = json_stdout(&cli(&workspace, &["cleanup", "--years", "2019"]));
    let deleted = real["totalDeleted"].as_i64().expect("totalDeleted");
    assert_eq!(deleted, 2);
    assert_eq!(students(&workspace), 4 - deleted);

    let listed = json_stdout(&cli(&workspace, &["list"]));
    assert_eq!(listed[0]["year"], serde_json::json!(2019));
    assert_eq!(listed[0]["studentCount"], serde_json::json!(2));
}

#[test]
fn reconcile_and_delete_students() {
    let workspace = temp_dir("deanlist-cli-reconcile");
    seed(&workspace);

    let rec = json_stdout(&cli(&workspace, &["reconcile"]));
    assert_eq!(rec["total"], serde_json::json!(4));
    assert_eq!(rec["deleted"], serde_json::json!(1));
    assert_eq!(rec["remaining"], serde_json::json!(3));

    let cleared = json_stdout(&cli(&workspace, &["delete-students", "-s", "spring", "-y", "2019"]));
    assert_eq!(cleared["deleted"], serde_json::json!(3));
    assert_eq!(students(&workspace), 0);
}

#[test]
fn cleanup_requires_a_year_selection() {
    let workspace = temp_dir("deanlist-cli-noargs");
    let out = cli(&workspace, &["cleanup"]);
    assert!(!out.status.success());
}

#[test]
fn import_rejects_non_workbook_files() {
    let workspace = temp_dir("deanlist-cli-import");
    let csv = workspace.join("list.csv");
    std::fs::write(&csv, "Student Name,Student ID\n").expect("write csv");

    let out = cli(
        &workspace,
        &["import", csv.to_str().expect("utf-8 path"), "-s", "fall", "-y", "2024"],
    );
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("valid Excel file"));
}

use crate::config;
use crate::import::{self, ImportOptions};
use crate::ipc::error::{err, import_err, ok};
use crate::ipc::helpers::{i64_param, opt_str_param, require_db, semester_param, str_param, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::sheet::Grid;
use crate::store;
use serde_json::json;
use std::path::PathBuf;

fn to_json<T: serde::Serialize>(req: &Request, v: &T) -> HandlerResult<serde_json::Value> {
    serde_json::to_value(v).map_err(|e| err(&req.id, "internal", e.to_string(), None))
}

fn handle_import(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    let semester = semester_param(req)?;
    let year = i64_param(req, "year")?;
    let settings = config::load_settings(conn).map_err(|e| import_err(&req.id, &e))?;

    let result = if let Some(rows) = req.params.get("rows") {
        let grid: Grid = serde_json::from_value(rows.clone())
            .map_err(|e| err(&req.id, "bad_params", format!("invalid rows: {e}"), None))?;
        let opts = ImportOptions {
            reconcile_scope: Some(settings.reconcile_scope),
            ..Default::default()
        };
        import::import_grid(conn, &grid, semester, year, &opts)
    } else {
        let path = PathBuf::from(str_param(req, "path")?);
        if !path.is_file() {
            return Err(err(
                &req.id,
                "not_found",
                "spreadsheet file not found",
                Some(json!({ "path": path.to_string_lossy() })),
            ));
        }
        let archive = state.archive_override.unwrap_or(settings.archive_workbooks);
        let archive_dir = if archive { state.workspace.as_deref() } else { None };
        import::import_workbook(
            conn,
            &path,
            semester,
            year,
            Some(settings.reconcile_scope),
            archive_dir,
        )
    };
    let report = result.map_err(|e| import_err(&req.id, &e))?;

    Ok(ok(&req.id, to_json(req, &report)?))
}

fn handle_list(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let Some(conn) = state.db.as_ref() else {
        return Ok(ok(&req.id, json!({ "deanLists": [] })));
    };
    let lists = store::list_batches(conn).map_err(|e| import_err(&req.id, &e))?;
    Ok(ok(&req.id, json!({ "deanLists": to_json(req, &lists)? })))
}

fn handle_delete(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    let id = match opt_str_param(req, "deanListId") {
        Some(id) => id,
        None => {
            let semester = semester_param(req)?;
            let year = i64_param(req, "year")?;
            store::find_batch(conn, semester, year)
                .map_err(|e| import_err(&req.id, &e))?
                .ok_or_else(|| err(&req.id, "not_found", "dean's list not found", None))?
                .id
        }
    };
    let removed = store::delete_batch(conn, &id).map_err(|e| import_err(&req.id, &e))?;
    Ok(ok(
        &req.id,
        json!({ "deanListId": id, "studentsDeleted": removed }),
    ))
}

fn handle_delete_students(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    let semester = semester_param(req)?;
    let year = i64_param(req, "year")?;
    let deleted = store::delete_batch_students(conn, semester, year)
        .map_err(|e| import_err(&req.id, &e))?;
    Ok(ok(&req.id, json!({ "deleted": deleted })))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "deanList.import" => handle_import(state, req),
        "deanList.list" => handle_list(state, req),
        "deanList.delete" => handle_delete(state, req),
        "deanList.deleteStudents" => handle_delete_students(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|resp| resp))
}

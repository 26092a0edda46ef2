use crate::ipc::error::{err, import_err, ok};
use crate::ipc::helpers::{i64_param, opt_str_param, require_db, semester_param, str_param, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::roster;

fn to_json<T: serde::Serialize>(req: &Request, v: &T) -> HandlerResult<serde_json::Value> {
    serde_json::to_value(v).map_err(|e| err(&req.id, "internal", e.to_string(), None))
}

fn handle_roster(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    let semester = semester_param(req)?;
    let year = i64_param(req, "year")?;
    let major = opt_str_param(req, "major");
    let r = roster::roster(conn, semester, year, major.as_deref())
        .map_err(|e| import_err(&req.id, &e))?;
    Ok(ok(&req.id, to_json(req, &r)?))
}

fn handle_search(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    if let Some(student_id) = opt_str_param(req, "studentId") {
        let rankings =
            roster::search_by_id(conn, &student_id).map_err(|e| import_err(&req.id, &e))?;
        let results = to_json(req, &roster::NameSearch::Rankings(rankings))?;
        return Ok(ok(&req.id, results));
    }
    let Some(name) = opt_str_param(req, "studentName") else {
        return Err(err(&req.id, "bad_params", "missing studentId or studentName", None));
    };
    let found = roster::search_by_name(conn, &name).map_err(|e| import_err(&req.id, &e))?;
    Ok(ok(&req.id, to_json(req, &found)?))
}

fn handle_eligibility(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    let student_id = str_param(req, "studentId")?;
    let e = roster::eligibility(conn, &student_id).map_err(|e| import_err(&req.id, &e))?;
    Ok(ok(&req.id, to_json(req, &e)?))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "deanList.roster" => handle_roster(state, req),
        "deanList.search" => handle_search(state, req),
        "deanList.eligibility" => handle_eligibility(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|resp| resp))
}

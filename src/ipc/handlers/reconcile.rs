use crate::config;
use crate::ipc::error::{err, import_err, ok};
use crate::ipc::helpers::{bool_param, require_db, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::reconcile::{self, CleanupRequest, YearSelection};
use serde_json::json;

fn handle_reconcile(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    let summary = reconcile::reconcile_all(conn).map_err(|e| import_err(&req.id, &e))?;
    let value =
        serde_json::to_value(&summary).map_err(|e| err(&req.id, "internal", e.to_string(), None))?;
    Ok(ok(&req.id, value))
}

fn year_selection(req: &Request) -> HandlerResult<YearSelection> {
    if let Some(years) = req.params.get("years").and_then(|v| v.as_array()) {
        let parsed: Option<Vec<i64>> = years.iter().map(|v| v.as_i64()).collect();
        return match parsed {
            Some(v) if !v.is_empty() => Ok(YearSelection::Years(v)),
            _ => Err(err(&req.id, "bad_params", "years must be a non-empty list of integers", None)),
        };
    }
    if let Some(n) = req.params.get("excludeFrom").and_then(|v| v.as_i64()) {
        return Ok(YearSelection::ExcludeFrom(n));
    }
    Err(err(
        &req.id,
        "bad_params",
        "specify either years or excludeFrom",
        None,
    ))
}

fn handle_cleanup(state: &mut AppState, req: &Request) -> HandlerResult<serde_json::Value> {
    let conn = require_db(state, req)?;
    let selection = year_selection(req)?;
    let settings = config::load_settings(conn).map_err(|e| import_err(&req.id, &e))?;
    let mut request = CleanupRequest::new(selection, bool_param(req, "dryRun"));
    request.min_id_digits = settings.min_student_id_digits;

    let report = reconcile::cleanup(conn, &request).map_err(|e| import_err(&req.id, &e))?;
    let mut value =
        serde_json::to_value(&report).map_err(|e| err(&req.id, "internal", e.to_string(), None))?;
    value["minStudentIdDigits"] = json!(request.min_id_digits);
    Ok(ok(&req.id, value))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "deanList.reconcile" => handle_reconcile(state, req),
        "deanList.cleanup" => handle_cleanup(state, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|resp| resp))
}

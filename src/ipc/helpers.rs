use rusqlite::Connection;

use crate::ipc::error::{err, import_err};
use crate::ipc::types::{AppState, Request};
use crate::store::Semester;

pub type HandlerResult<T> = Result<T, serde_json::Value>;

pub fn require_db<'a>(state: &'a AppState, req: &Request) -> HandlerResult<&'a Connection> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn str_param(req: &Request, key: &str) -> HandlerResult<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

pub fn opt_str_param(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Integer parameter; numeric strings such as `"2024"` are accepted too.
pub fn i64_param(req: &Request, key: &str) -> HandlerResult<i64> {
    let v = req.params.get(key);
    v.and_then(|v| v.as_i64())
        .or_else(|| v.and_then(|v| v.as_str()).and_then(|s| s.trim().parse().ok()))
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing or invalid {key}"), None))
}

pub fn bool_param(req: &Request, key: &str) -> bool {
    req.params
        .get(key)
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

pub fn semester_param(req: &Request) -> HandlerResult<Semester> {
    let raw = str_param(req, "semester")?;
    Semester::parse(&raw).map_err(|e| import_err(&req.id, &e))
}

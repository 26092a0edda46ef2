use serde_json::json;

use crate::error::ImportError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Envelope for a library error, with structured details where they help
/// the caller explain the failure.
pub fn import_err(id: &str, e: &ImportError) -> serde_json::Value {
    let details = match e {
        ImportError::MissingColumn { field, available } => Some(json!({
            "field": field,
            "availableColumns": available,
        })),
        ImportError::DuplicateBatch { semester, year } => Some(json!({
            "semester": semester,
            "year": year,
        })),
        _ => None,
    };
    err(id, e.code(), e.to_string(), details)
}

//! Process configuration (environment) and persisted application settings.
//!
//! Settings live in `app_settings`, which holds exactly one row. That is an
//! access-layer rule: [`load_settings`] creates the row when missing and
//! [`update_settings`] only ever touches the row it loaded.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ImportError, Result};

pub const WORKSPACE_ENV: &str = "DEANLIST_WORKSPACE";
pub const ARCHIVE_ENV: &str = "DEANLIST_ARCHIVE";

/// Settings read once at process start.
#[derive(Debug, Clone, Default)]
pub struct DaemonConfig {
    pub workspace: Option<PathBuf>,
    pub archive_override: Option<bool>,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let workspace = std::env::var(WORKSPACE_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        let archive_override = std::env::var(ARCHIVE_ENV).ok().and_then(|v| parse_flag(&v));
        Self {
            workspace,
            archive_override,
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Which records the automatic post-import pass examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileScope {
    /// Every stored record, whatever batch it belongs to.
    All,
    /// Only the batch that was just imported.
    Batch,
}

impl ReconcileScope {
    pub fn as_str(self) -> &'static str {
        match self {
            ReconcileScope::All => "all",
            ReconcileScope::Batch => "batch",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Some(ReconcileScope::All),
            "batch" => Some(ReconcileScope::Batch),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub reconcile_scope: ReconcileScope,
    pub min_student_id_digits: u32,
    pub archive_workbooks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reconcile_scope: ReconcileScope::All,
            min_student_id_digits: 5,
            archive_workbooks: false,
        }
    }
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub reconcile_scope: Option<ReconcileScope>,
    pub min_student_id_digits: Option<u32>,
    pub archive_workbooks: Option<bool>,
}

pub fn load_settings(conn: &Connection) -> Result<Settings> {
    let row = conn
        .query_row(
            "SELECT reconcile_scope, min_student_id_digits, archive_workbooks
             FROM app_settings ORDER BY id LIMIT 1",
            [],
            |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, i64>(1)?,
                    r.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((scope, digits, archive)) = row else {
        let settings = Settings::default();
        conn.execute(
            "INSERT INTO app_settings(reconcile_scope, min_student_id_digits, archive_workbooks, updated_at)
             VALUES(?, ?, ?, ?)",
            (
                settings.reconcile_scope.as_str(),
                settings.min_student_id_digits as i64,
                settings.archive_workbooks as i64,
                Utc::now().to_rfc3339(),
            ),
        )?;
        return Ok(settings);
    };

    Ok(Settings {
        reconcile_scope: ReconcileScope::parse(&scope).unwrap_or(ReconcileScope::All),
        min_student_id_digits: u32::try_from(digits).unwrap_or(5),
        archive_workbooks: archive != 0,
    })
}

pub fn update_settings(conn: &Connection, patch: &SettingsPatch) -> Result<Settings> {
    let mut settings = load_settings(conn)?;
    if let Some(scope) = patch.reconcile_scope {
        settings.reconcile_scope = scope;
    }
    if let Some(digits) = patch.min_student_id_digits {
        if digits == 0 {
            return Err(ImportError::InvalidInput(
                "minStudentIdDigits must be at least 1".into(),
            ));
        }
        settings.min_student_id_digits = digits;
    }
    if let Some(archive) = patch.archive_workbooks {
        settings.archive_workbooks = archive;
    }

    conn.execute(
        "UPDATE app_settings
         SET reconcile_scope = ?, min_student_id_digits = ?, archive_workbooks = ?, updated_at = ?
         WHERE id = (SELECT id FROM app_settings ORDER BY id LIMIT 1)",
        (
            settings.reconcile_scope.as_str(),
            settings.min_student_id_digits as i64,
            settings.archive_workbooks as i64,
            Utc::now().to_rfc3339(),
        ),
    )?;
    info!(?settings, "settings updated");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn load_creates_exactly_one_default_row() {
        let conn = db::open_in_memory().unwrap();
        assert_eq!(load_settings(&conn).unwrap(), Settings::default());
        assert_eq!(load_settings(&conn).unwrap(), Settings::default());
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM app_settings", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn patch_keeps_unset_fields() {
        let conn = db::open_in_memory().unwrap();
        let s = update_settings(
            &conn,
            &SettingsPatch {
                reconcile_scope: Some(ReconcileScope::Batch),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(s.reconcile_scope, ReconcileScope::Batch);
        assert_eq!(s.min_student_id_digits, 5);
        assert_eq!(load_settings(&conn).unwrap(), s);
    }

    #[test]
    fn zero_digit_minimum_is_rejected() {
        let conn = db::open_in_memory().unwrap();
        let res = update_settings(
            &conn,
            &SettingsPatch {
                min_student_id_digits: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(res, Err(ImportError::InvalidInput(_))));
    }

    #[test]
    fn flags_parse_loosely() {
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}

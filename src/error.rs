use thiserror::Error;

pub type Result<T> = std::result::Result<T, ImportError>;

/// Failures that abort an import, reconcile or cleanup call as a whole.
///
/// Row-level problems (unusable rows, a single failed insert or delete) never
/// show up here; they are counted in the returned reports and logged.
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("unreadable spreadsheet: {0}")]
    Unreadable(String),

    #[error("could not find a valid header row in the spreadsheet")]
    HeaderNotFound,

    #[error("could not find the {field} column (available columns: {})", available.join(", "))]
    MissingColumn {
        field: &'static str,
        available: Vec<String>,
    },

    #[error("a dean's list for {semester} {year} already exists")]
    DuplicateBatch { semester: String, year: i64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Stable short code used in IPC error envelopes and CLI exit messages.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::Unreadable(_) => "unreadable",
            ImportError::HeaderNotFound => "header_not_found",
            ImportError::MissingColumn { .. } => "missing_column",
            ImportError::DuplicateBatch { .. } => "duplicate_batch",
            ImportError::InvalidInput(_) => "bad_params",
            ImportError::NotFound(_) => "not_found",
            ImportError::Database(_) => "db_query_failed",
            ImportError::Io(_) => "io_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_lists_available_labels() {
        let e = ImportError::MissingColumn {
            field: "student id",
            available: vec!["Name".into(), "GPA".into()],
        };
        assert_eq!(
            e.to_string(),
            "could not find the student id column (available columns: Name, GPA)"
        );
        assert_eq!(e.code(), "missing_column");
    }
}

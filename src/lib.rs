//! Dean's list ingestion and reconciliation.
//!
//! A raw spreadsheet goes through [`sheet::locate_header_row`],
//! [`columns::resolve_all`] and [`import::ingest_rows`], ending up as
//! `dean_list_students` rows under one batch per semester/year.
//! [`reconcile`] then removes records with placeholder names or IDs.
//! [`roster`] holds the read-side queries.

pub mod archive;
pub mod columns;
pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod ipc;
pub mod logging;
pub mod normalize;
pub mod reconcile;
pub mod roster;
pub mod sheet;
pub mod store;

pub use error::{ImportError, Result};
pub use import::{import_grid, import_workbook, ImportOptions, ImportReport};
pub use reconcile::{cleanup, reconcile_all, CleanupReport, CleanupRequest, ReconcileSummary, YearSelection};
pub use sheet::{Cell, Grid};
pub use store::Semester;

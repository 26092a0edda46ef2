use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use deanlist::config::{self, WORKSPACE_ENV};
use deanlist::reconcile::{CleanupRequest, YearSelection};
use deanlist::{db, import, logging, reconcile, store, Semester};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "deanlist-cli")]
#[command(about = "Dean's list import and cleanup tools", long_about = None)]
struct Cli {
    /// Workspace directory holding the database
    #[arg(short = 'w', long, env = WORKSPACE_ENV)]
    workspace: PathBuf,

    /// Print machine-readable JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a dean's list workbook for one semester
    Import {
        /// Path to the .xlsx/.xls/.ods file
        file: PathBuf,

        /// fall or spring
        #[arg(short = 's', long)]
        semester: String,

        #[arg(short = 'y', long)]
        year: i64,

        /// Keep a copy of the workbook in the workspace
        #[arg(long)]
        archive: bool,
    },
    /// Remove records with empty or placeholder names and IDs, in every year
    Reconcile,
    /// Clean dean's list records for specific years
    #[command(group(ArgGroup::new("selection").required(true).args(["years", "exclude_from"])))]
    Cleanup {
        /// Years to clean
        #[arg(long, num_args = 1..)]
        years: Vec<i64>,

        /// Clean every year below this one
        #[arg(long)]
        exclude_from: Option<i64>,

        /// Show what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// List imported dean's lists
    List,
    /// Delete every record of one semester, keeping the list itself
    DeleteStudents {
        #[arg(short = 's', long)]
        semester: String,

        #[arg(short = 'y', long)]
        year: i64,
    },
}

fn emit<T: Serialize>(json: bool, value: &T, summary: impl FnOnce(&T)) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        summary(value);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let conn = db::open_db(&cli.workspace)
        .with_context(|| format!("failed to open workspace {}", cli.workspace.display()))?;
    let settings = config::load_settings(&conn)?;

    match cli.command {
        Commands::Import {
            file,
            semester,
            year,
            archive,
        } => {
            let semester = Semester::parse(&semester)?;
            let archive_dir = (archive || settings.archive_workbooks).then_some(cli.workspace.as_path());
            let report = import::import_workbook(
                &conn,
                &file,
                semester,
                year,
                Some(settings.reconcile_scope),
                archive_dir,
            )?;
            emit(cli.json, &report, |r| {
                println!(
                    "Dean's list created successfully. {} students imported.",
                    r.students_saved()
                );
                println!(
                    "Header row: {}  rows processed: {}  skipped: {}  errors: {}",
                    r.header_row_index, r.stats.rows_processed, r.stats.rows_skipped, r.stats.row_errors
                );
                println!(
                    "Reconcile: {} invalid records deleted, {} remaining",
                    r.reconcile.deleted, r.reconcile.remaining
                );
            })?;
        }
        Commands::Reconcile => {
            let summary = reconcile::reconcile_all(&conn)?;
            emit(cli.json, &summary, |s| {
                println!("Total records before cleanup: {}", s.total);
                println!("Invalid records deleted: {}", s.deleted);
                println!("Records remaining: {}", s.remaining);
            })?;
        }
        Commands::Cleanup {
            years,
            exclude_from,
            dry_run,
        } => {
            let selection = match exclude_from {
                Some(n) => YearSelection::ExcludeFrom(n),
                None => YearSelection::Years(years),
            };
            let mut request = CleanupRequest::new(selection, dry_run);
            request.min_id_digits = settings.min_student_id_digits;
            let report = reconcile::cleanup(&conn, &request)?;
            emit(cli.json, &report, |r| {
                for y in &r.per_year {
                    println!(
                        "Year {}: {} checked, {} invalid, {} {}",
                        y.year,
                        y.checked,
                        y.invalid.len(),
                        y.deleted,
                        if r.dry_run { "would be deleted" } else { "deleted" }
                    );
                }
                println!("Years processed: {:?}", r.years);
                println!("Total records checked: {}", r.total_checked);
                if r.dry_run {
                    println!("Records that would be deleted: {}", r.total_deleted);
                } else {
                    println!("Total records deleted: {}", r.total_deleted);
                }
            })?;
        }
        Commands::List => {
            let lists = store::list_batches(&conn)?;
            emit(cli.json, &lists, |lists| {
                if lists.is_empty() {
                    println!("No dean's lists imported.");
                }
                for l in lists {
                    println!(
                        "{} {}  {} students  ({})",
                        l.batch.semester, l.batch.year, l.student_count, l.batch.id
                    );
                }
            })?;
        }
        Commands::DeleteStudents { semester, year } => {
            let semester = Semester::parse(&semester)?;
            let deleted = store::delete_batch_students(&conn, semester, year)?;
            emit(cli.json, &serde_json::json!({ "deleted": deleted }), |_| {
                println!("Deleted {deleted} records for {semester} {year}.");
            })?;
        }
    }
    Ok(())
}

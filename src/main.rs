use deanlist::config::{self, DaemonConfig};
use deanlist::{db, ipc, logging};
use std::io::{self, BufRead, Write};
use tracing::{info, warn};

fn main() {
    logging::init();
    let cfg = DaemonConfig::from_env();
    info!(version = env!("CARGO_PKG_VERSION"), "deanlistd starting");

    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        archive_override: cfg.archive_override,
    };

    if let Some(path) = cfg.workspace {
        match db::open_db(&path).and_then(|conn| {
            config::load_settings(&conn)?;
            Ok(conn)
        }) {
            Ok(conn) => {
                info!(workspace = %path.display(), "workspace opened from {}", config::WORKSPACE_ENV);
                state.workspace = Some(path);
                state.db = Some(conn);
            }
            Err(e) => {
                let error = format!("{e:#}");
                warn!(workspace = %path.display(), %error, "failed to open workspace");
            }
        }
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{resp}");
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
    info!("stdin closed, exiting");
}

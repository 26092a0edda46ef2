use tracing_subscriber::EnvFilter;

/// Install the console subscriber.
///
/// Output goes to stderr because stdout carries IPC responses. `RUST_LOG`
/// wins when set; otherwise `LOG_LEVEL` (default `info`) applies to this
/// crate's targets. Calling it twice is harmless.
pub fn init() {
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "deanlist={log_level},deanlistd={log_level},deanlist_cli={log_level},warn"
        ))
    });

    let _ = tracing_subscriber::fmt()
        .compact()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false)
        .try_init();
}

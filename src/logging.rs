use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_DIR: &str = "logs";
const LOG_FILE: &str = "cleaner.log";

/// Initializes console and daily-rotated JSON file logging.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// for the whole run.
pub fn init_logging() -> Option<WorkerGuard> {
    let file = match fs::create_dir_all(LOG_DIR) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
            Some(tracing_appender::non_blocking(file_appender))
        }
        Err(e) => {
            eprintln!("[logging] could not create {LOG_DIR}/, file logging disabled: {e}");
            None
        }
    };
    let (file_writer, guard) = match file {
        Some((writer, guard)) => (Some(writer), Some(guard)),
        None => (None, None),
    };

    let file_layer = file_writer.map(|w| fmt::layer().json().with_writer(w));

    // Console output goes to stderr so it never interleaves with the report text
    let console_layer = fmt::layer().with_target(true).with_writer(std::io::stderr);

    // Respect RUST_LOG if set; otherwise info for our crate, warn elsewhere
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("roster_cleaner=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}

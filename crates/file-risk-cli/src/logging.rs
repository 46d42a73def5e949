use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILE_PATH: &str = "./logs/file-risk.log";
const VERBOSE_FILTER: &str = "info,file_risk_core=debug,file_risk=debug";

/// Log to stdout and to a single file. `TRACING_LEVEL` sets the filter unless
/// `verbose` is on; `LOG_FILE_PATH` overrides the default `./logs/file-risk.log`.
pub fn init_logger(verbose: bool) -> WorkerGuard {
    let filter = if verbose {
        VERBOSE_FILTER.to_string()
    } else {
        env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string())
    };
    let filter_layer = EnvFilter::new(filter);

    let (dir, file) = log_file_location(env::var("LOG_FILE_PATH").ok().as_deref());
    let file_appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .compact()
                .with_target(false)
                .without_time()
                .with_ansi(true),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter_layer)
        .init();

    info!("Logging to stdout and file");

    guard
}

/// Split a log file path into the directory and file name the appender wants.
fn log_file_location(configured: Option<&str>) -> (PathBuf, OsString) {
    let path = Path::new(configured.unwrap_or(DEFAULT_LOG_FILE_PATH));
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let file = path
        .file_name()
        .map(|f| f.to_os_string())
        .unwrap_or_else(|| OsString::from("file-risk.log"));
    (dir, file)
}

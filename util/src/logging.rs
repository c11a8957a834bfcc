use crate::config::AppConfig;
use std::path::Path;
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global tracing subscriber for a binary.
///
/// Writes to a daily-rolling file under the directory of `config.log_file`
/// (or `logs/` when it has none) and, if `log_to_stdout` is set, to stdout
/// as well. The returned guard must live until the program exits or buffered
/// lines are lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let log_path = Path::new(&config.log_file);
    let dir = match log_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new("logs").to_path_buf(),
    };
    let file_name = log_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.log", config.project_name));

    std::fs::create_dir_all(&dir).ok();

    let file_appender = rolling::daily(&dir, file_name);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true);

    let stdout_layer = config.log_to_stdout.then(|| {
        fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true)
    });

    let env_filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("learnit=info,tables=info"));

    let initialised = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init();

    if initialised.is_err() {
        tracing::warn!("tracing subscriber was already initialized");
    }

    guard
}

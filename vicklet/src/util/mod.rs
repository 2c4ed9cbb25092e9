mod host;
pub mod quantity;

pub use host::{local_ipv4_addresses, resolve_host_uuid};

use std::io;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::runtime::LogConfig;

/// Initialize tracing for the process.
///
/// Events go to stdout and to `<dir>/virtual-kubelet.log` through a
/// non-blocking writer. If the log file cannot be opened, only stdout is
/// used and an error event records why.
///
/// Returns the WorkerGuard that must be kept alive to flush the file writer.
pub fn init_logging(config: &LogConfig) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match open_log_file(config) {
        Ok(appender) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            register_to_tracing(Some(non_blocking), env_filter);
            tracing::debug!(path = %config.file_path().display(), "Logging to file");
            Some(guard)
        }
        Err(e) => {
            register_to_tracing(None, env_filter);
            tracing::error!(
                path = %config.file_path().display(),
                error = %e,
                "Failed to open log file, logging to stdout only"
            );
            None
        }
    }
}

fn open_log_file(config: &LogConfig) -> io::Result<RollingFileAppender> {
    std::fs::create_dir_all(&config.dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&config.file_name)
        .build(&config.dir)
        .map_err(io::Error::other)
}

pub fn register_to_tracing(file: Option<NonBlocking>, env_filter: EnvFilter) {
    let file_layer = file.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(false)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(fmt::layer().with_writer(io::stdout).with_target(true))
        .try_init();
}

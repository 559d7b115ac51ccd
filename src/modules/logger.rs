// 日志模块
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{AppError, AppResult};

const LOG_FILE_PREFIX: &str = "gateway.log";

/// Install the global subscriber.
///
/// Console output always; a daily rolling file when `log_dir` is set. The returned guard
/// flushes the file writer on drop and must be held for the life of the process.
pub fn init_logger(log_dir: Option<&Path>) -> AppResult<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_timer(fmt::time::UtcTime::rfc_3339());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::Logger(e.to_string()))?;

    if let Some(dir) = log_dir {
        tracing::info!("File logging enabled: {}", dir.display());
    }

    Ok(guard)
}

pub fn log_info(message: &str) {
    tracing::info!("{}", message);
}

pub fn log_warn(message: &str) {
    tracing::warn!("{}", message);
}

pub fn log_error(message: &str) {
    tracing::error!("{}", message);
}

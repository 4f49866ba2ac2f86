//! Логирование на `tracing`.
//!
//! Консольный вывод идёт в stderr, чтобы stdout оставался за результатом
//! команды. Дополнительно можно писать в файл через `tracing-appender`.

pub mod config;
mod filters;
mod formatter;
pub mod handle;

pub use config::{FileSinkConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;

use aclsync_error::LoggingError;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt};

/// Инициализация логирования с конфигурацией.
///
/// `RUST_LOG` имеет приоритет над уровнем из конфигурации.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, LoggingError> {
    config.ensure_log_dir()?;
    let env_filter = filters::build_filter_from_config(config)?;

    let mut layers = vec![formatter::build_formatter(
        config,
        BoxMakeWriter::new(std::io::stderr),
        config.with_ansi,
    )];

    let file_guard = match &config.file {
        Some(file) => {
            let appender = rolling::daily(&file.dir, &file.filename);
            let (writer, guard) = non_blocking(appender);
            layers.push(formatter::build_formatter(
                config,
                BoxMakeWriter::new(writer),
                false,
            ));
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = ?config.format,
        file_sink = file_guard.is_some(),
        "logging initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}

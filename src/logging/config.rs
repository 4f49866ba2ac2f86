use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use aclsync_error::LoggingError;

/// Формат вывода логов.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Многострочный человекочитаемый формат.
    Pretty,
    /// Однострочный формат.
    #[default]
    Compact,
    /// JSON, одна запись на строку.
    Json,
}

/// Конфигурация логирования.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Уровень или директива `EnvFilter` (`info`, `aclsync=debug,warn`).
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    /// ANSI-цвета в консоли.
    #[serde(default = "default_true")]
    pub with_ansi: bool,
    #[serde(default = "default_true")]
    pub with_target: bool,
    /// Дополнительная запись в файл.
    #[serde(default)]
    pub file: Option<FileSinkConfig>,
}

/// Файловый вывод через `tracing-appender`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct FileSinkConfig {
    pub dir: PathBuf,
    #[serde(default = "default_filename")]
    pub filename: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_filename() -> String {
    "aclsync.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Директива фильтра из конфигурации.
    ///
    /// Голый уровень (`debug`) применяется к aclsync, а зависимости
    /// ограничиваются `warn`, чтобы `redis` и `tokio` не засоряли вывод.
    pub fn build_filter_directive(&self) -> String {
        let level = self.level.trim();
        if level.contains('=') || level.contains(',') {
            level.to_string()
        } else {
            format!("warn,aclsync={level}")
        }
    }

    /// Проверяет, что директива разбирается `EnvFilter`.
    pub fn validate(&self) -> Result<(), LoggingError> {
        let directive = self.build_filter_directive();
        tracing_subscriber::EnvFilter::try_new(&directive)
            .map(|_| ())
            .map_err(|e| LoggingError::InvalidDirective {
                directive,
                reason: e.to_string(),
            })
    }

    /// Создаёт каталог для файлового вывода, если он задан.
    pub fn ensure_log_dir(&self) -> Result<(), LoggingError> {
        if let Some(file) = &self.file {
            std::fs::create_dir_all(&file.dir)
                .map_err(|e| LoggingError::File(format!("{}: {e}", file.dir.display())))?;
        }
        Ok(())
    }
}

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;

use aclsync_error::SettingsError;

use crate::account::Secret;
use crate::connection::ConnectionParams;
use crate::logging::LoggingConfig;

/// Префикс переменных окружения (`ACLSYNC_HOST`, `ACLSYNC_LOG__LEVEL`).
pub const ENV_PREFIX: &str = "ACLSYNC";

/// Настройки aclsync.
///
/// Источники по возрастанию приоритета: значения по умолчанию, TOML-файл,
/// переменные окружения. Флаги командной строки накладываются поверх в
/// `main`.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Secret>,
    #[serde(default)]
    pub log: LoggingConfig,
}

impl Settings {
    /// Загружает и проверяет настройки.
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = Config::builder()
            // Значения по умолчанию
            .set_default("host", "127.0.0.1")
            .map_err(load_error)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
        }

        let cfg = builder
            // Переменные окружения с префиксом ACLSYNC_, вложенные ключи через `__`
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .map_err(load_error)?;

        let settings: Settings = cfg.try_deserialize().map_err(load_error)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.host.trim().is_empty() {
            return Err(SettingsError::Invalid {
                field: "host",
                reason: "must not be empty".to_string(),
            });
        }
        if self.port == Some(0) {
            return Err(SettingsError::Invalid {
                field: "port",
                reason: "must be in 1..=65535".to_string(),
            });
        }
        self.log.validate().map_err(|e| SettingsError::Invalid {
            field: "log.level",
            reason: e.to_string(),
        })
    }

    /// Параметры подключения из настроек.
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

fn load_error(e: config::ConfigError) -> SettingsError {
    SettingsError::Load(e.to_string())
}

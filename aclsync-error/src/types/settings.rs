use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Ошибки загрузки и проверки настроек.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// Источник конфигурации не удалось прочитать или разобрать.
    #[error("config load error: {0}")]
    Load(String),
    /// Значение поля недопустимо.
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Ошибки инициализации логирования.
#[derive(Debug, Clone, Error)]
pub enum LoggingError {
    #[error("invalid log filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },
    #[error("log file error: {0}")]
    File(String),
    #[error("global subscriber already set: {0}")]
    AlreadyInitialized(String),
}

impl ErrorExt for SettingsError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Load(_) => StatusCode::ParseError,
            Self::Invalid { .. } => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

impl ErrorExt for LoggingError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidDirective { .. } => StatusCode::InvalidArgs,
            Self::File(_) => StatusCode::Io,
            Self::AlreadyInitialized(_) => StatusCode::Unexpected,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_setting_message() {
        let err = SettingsError::Invalid {
            field: "connection.port",
            reason: "must be in 1..=65535".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid setting `connection.port`: must be in 1..=65535"
        );
        assert_eq!(err.status_code(), StatusCode::InvalidArgs);
    }
}

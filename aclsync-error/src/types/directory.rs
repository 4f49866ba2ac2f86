use std::fmt;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Операция жизненного цикла, к которой относится ошибка или диагностика.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Import,
}

/// Почему операция была прервана.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Вызывающий явно отменил операцию.
    Cancelled,
    /// Истёк дедлайн, переданный вызывающим.
    DeadlineExceeded,
}

/// Ошибки каталога учётных записей и адаптера жизненного цикла.
///
/// `NotFound` здесь намеренно отсутствует: отсутствие пользователя
/// нормализуется в `false` на границе `exists` и дальше не распространяется.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// `create` вызван для имени, которое уже существует в хранилище.
    #[error("duplicate user: {username}")]
    DuplicateAccount { username: String },
    /// Хранилище отклонило запись или запись не дошла (транспорт, авторизация).
    /// Текст хранилища передаётся как есть.
    #[error("{message}")]
    StoreWriteFailed {
        operation: Operation,
        message: String,
    },
    /// Не удалось определить, существует ли пользователь.
    #[error("unable to determine whether user {username} exists: {message}")]
    QueryFailed { username: String, message: String },
    /// Операция вызвана до того, как адаптеру передали соединение.
    #[error("redis connection is not configured")]
    NotConfigured,
    /// Отмена или истечение дедлайна во время обращения к хранилищу.
    #[error("{operation} {reason}")]
    Cancelled {
        operation: Operation,
        reason: CancelReason,
    },
    /// Входная запись не прошла проверку.
    #[error("invalid account: {reason}")]
    InvalidAccount { reason: String },
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Import => "import",
        }
    }
}

impl DirectoryError {
    /// Является ли ошибка отменой (а не отказом хранилища).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for Operation {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CancelReason {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Cancelled => f.write_str("cancelled"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

impl ErrorExt for DirectoryError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateAccount { .. } => StatusCode::AlreadyExists,
            Self::StoreWriteFailed { .. } => StatusCode::StoreWriteFailed,
            Self::QueryFailed { .. } => StatusCode::StoreQueryFailed,
            Self::NotConfigured => StatusCode::NotConfigured,
            Self::Cancelled {
                reason: CancelReason::DeadlineExceeded,
                ..
            } => StatusCode::Timeout,
            Self::Cancelled { .. } => StatusCode::Cancelled,
            Self::InvalidAccount { .. } => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let mut tags = vec![
            ("error_type", "directory".to_string()),
            ("status_code", self.status_code().to_string()),
        ];

        match self {
            Self::StoreWriteFailed { operation, .. } | Self::Cancelled { operation, .. } => {
                tags.push(("operation", operation.to_string()));
            }
            Self::DuplicateAccount { username } | Self::QueryFailed { username, .. } => {
                tags.push(("username", username.clone()));
            }
            _ => {}
        }

        tags
    }
}

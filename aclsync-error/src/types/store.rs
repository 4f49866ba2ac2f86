use thiserror::Error;

use crate::{ErrorExt, StatusCode};

pub type StoreResult<T> = Result<T, StoreError>;

/// Ошибки на границе ACL-хранилища.
///
/// Бэкенды (Redis, in-memory) переводят свои ошибки в эти варианты один раз;
/// выше по стеку сырые ответы хранилища не разбираются.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Соединение не установлено, оборвалось или истёк сетевой таймаут.
    #[error("{message}")]
    Transport { message: String },
    /// Хранилище отказало в доступе (неверные учётные данные, NOPERM).
    #[error("{message}")]
    Auth { message: String },
    /// Хранилище вернуло ошибку на команду (например, неверное ACL-правило).
    #[error("{message}")]
    Rejected { message: String },
    /// Ответ хранилища не удалось разобрать.
    #[error("unexpected reply from store: {reply}")]
    UnexpectedReply { reply: String },
}

impl StoreError {
    /// Текст ошибки хранилища без дополнительных префиксов.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl ErrorExt for StoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Transport { .. } => StatusCode::ConnectionFailed,
            Self::Auth { .. } => StatusCode::AuthFailed,
            Self::Rejected { .. } => StatusCode::InvalidCommand,
            Self::UnexpectedReply { .. } => StatusCode::UnexpectedReply,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 2xxx: Ошибки данных (входные записи, существование учётных записей)
/// - 3xxx: Авторизация / конфигурация подключения
/// - 5xxx: ACL-хранилище
/// - 6xxx: Сеть / IO / отмена
/// - 8xxx: Протокольные ошибки
///
/// `num_enum::TryFromPrimitive` даёт `TryFrom<u32>` для кода, пришедшего
/// от хоста оркестрации числом.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Unknown = 1000,
    Unexpected = 1002,
    Internal = 1003,
    InvalidArgs = 1004,

    // === 2xxx: Ошибки данных ===
    NotFound = 2000,
    AlreadyExists = 2001,
    InvalidData = 2009,

    // === 3xxx: Авторизация/Конфигурация ===
    AuthFailed = 3000,
    PermissionDenied = 3001,
    NotConfigured = 3010,

    // === 5xxx: Хранилище ===
    StorageUnavailable = 5000,
    StoreWriteFailed = 5008,
    StoreQueryFailed = 5009,

    // === 6xxx: Сеть/IO ===
    Io = 6000,
    ConnectionClosed = 6001,
    Timeout = 6002,
    ConnectionFailed = 6004,
    Cancelled = 6008,

    // === 8xxx: Протокол ===
    InvalidCommand = 8001,
    ParseError = 8009,
    UnexpectedReply = 8012,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Имеет ли смысл повторить операцию на стороне вызывающего.
    ///
    /// Сам aclsync операции не повторяет; CLI по этому признаку добавляет к
    /// диагностике подсказку о повторном запуске.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::StorageUnavailable | Self::ConnectionFailed | Self::Cancelled
        )
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        // Если включён feature "strum", используем human-readable имя (AsRefStr).
        // Иначе Debug-имя.
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что retryable-коды помечаются корректно.
    #[test]
    fn test_retryable() {
        assert!(StatusCode::Timeout.is_retryable());
        assert!(StatusCode::Cancelled.is_retryable());
        assert!(!StatusCode::AlreadyExists.is_retryable());
        assert!(!StatusCode::StoreWriteFailed.is_retryable());
    }

    /// Тест проверяет конвертацию через `TryFrom<u32>`.
    #[test]
    fn test_try_from_u32() {
        let n = StatusCode::StoreWriteFailed.code();
        assert_eq!(
            StatusCode::try_from(n).unwrap(),
            StatusCode::StoreWriteFailed
        );
        assert!(StatusCode::try_from(99999).is_err());
    }

    #[test]
    fn test_code_and_into() {
        let c = StatusCode::AlreadyExists;
        assert_eq!(c.code(), 2001);
        let n: u32 = c.into();
        assert_eq!(n, 2001);
    }

    /// Тест проверяет формат `Display`: имя варианта и числовой код.
    #[test]
    fn test_display_contains_name_and_code() {
        let s = format!("{}", StatusCode::Cancelled);
        assert!(s.contains("6008"), "Display must contain code, got: {s}");
        assert!(
            s.contains("Cancelled"),
            "Display must contain variant name, got: {s}"
        );
    }
}

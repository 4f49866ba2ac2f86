use std::fmt;

use aclsync_error::DirectoryError;

use super::Secret;

/// Значение, которым хост оркестрации обозначает "без ограничения базы".
pub const UNRESTRICTED_SENTINEL: i64 = -1;

/// Имя ACL-пользователя. Первичный ключ учётной записи в хранилище.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Username(String);

/// Ограничение на выбор базы данных командой SELECT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseScope {
    /// Пользователь может выбрать любую базу.
    #[default]
    Unrestricted,
    /// Пользователь может выбрать только базу с этим индексом.
    Index(u32),
}

/// Нормализованная желаемая учётная запись.
///
/// Всегда создаётся включённой: жизненный цикл отключённых пользователей не
/// моделируется.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: Username,
    pub password: Secret,
    pub scope: DatabaseScope,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl Username {
    /// Проверяет и создаёт имя пользователя.
    ///
    /// Redis не принимает в именах пробелы и NUL, пустое имя тоже недопустимо.
    pub fn new(name: impl Into<String>) -> Result<Self, DirectoryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DirectoryError::InvalidAccount {
                reason: "username must not be empty".to_string(),
            });
        }
        if name.chars().any(|c| c.is_whitespace() || c == '\0') {
            return Err(DirectoryError::InvalidAccount {
                reason: format!("username {name:?} contains whitespace or NUL"),
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DatabaseScope {
    /// Нормализует необязательный индекс базы из записи хоста.
    ///
    /// `None` и `-1` означают "без ограничения"; значения меньше `-1` и больше
    /// `u32::MAX` отклоняются.
    pub fn from_optional(db: Option<i64>) -> Result<Self, DirectoryError> {
        match db {
            None | Some(UNRESTRICTED_SENTINEL) => Ok(Self::Unrestricted),
            Some(n) if n >= 0 => u32::try_from(n).map(Self::Index).map_err(|_| {
                DirectoryError::InvalidAccount {
                    reason: format!("db index {n} is out of range"),
                }
            }),
            Some(n) => Err(DirectoryError::InvalidAccount {
                reason: format!("db must be -1 (unrestricted) or a non-negative index, got {n}"),
            }),
        }
    }

    /// Представление с сигнальным значением `-1`.
    pub fn as_sentinel(&self) -> i64 {
        match self {
            Self::Unrestricted => UNRESTRICTED_SENTINEL,
            Self::Index(n) => i64::from(*n),
        }
    }

    pub fn is_restricted(&self) -> bool {
        matches!(self, Self::Index(_))
    }
}

impl Account {
    pub fn new(
        username: Username,
        password: Secret,
        scope: DatabaseScope,
    ) -> Self {
        Self {
            username,
            password,
            scope,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for Username {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseScope {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Unrestricted => f.write_str("unrestricted"),
            Self::Index(n) => write!(f, "db {n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(None, DatabaseScope::Unrestricted)]
    #[case(Some(-1), DatabaseScope::Unrestricted)]
    #[case(Some(0), DatabaseScope::Index(0))]
    #[case(Some(3), DatabaseScope::Index(3))]
    fn scope_normalization(
        #[case] input: Option<i64>,
        #[case] expected: DatabaseScope,
    ) {
        assert_eq!(DatabaseScope::from_optional(input).unwrap(), expected);
    }

    #[rstest]
    #[case(Some(-2))]
    #[case(Some(i64::MIN))]
    #[case(Some(i64::from(u32::MAX) + 1))]
    fn scope_rejects_out_of_range(#[case] input: Option<i64>) {
        assert!(matches!(
            DatabaseScope::from_optional(input),
            Err(DirectoryError::InvalidAccount { .. })
        ));
    }

    #[test]
    fn sentinel_round_trip() {
        assert_eq!(DatabaseScope::Unrestricted.as_sentinel(), -1);
        assert_eq!(DatabaseScope::Index(7).as_sentinel(), 7);
        assert!(!DatabaseScope::Unrestricted.is_restricted());
        assert!(DatabaseScope::Index(0).is_restricted());
    }

    #[test]
    fn username_validation() {
        assert_eq!(Username::new("alice").unwrap().as_str(), "alice");
        assert!(Username::new("").is_err());
        assert!(Username::new("al ice").is_err());
        assert!(Username::new("bob\0").is_err());
    }
}

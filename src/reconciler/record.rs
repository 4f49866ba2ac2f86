use serde::{Deserialize, Serialize};

use aclsync_error::DirectoryError;

use crate::account::{Account, DatabaseScope, Secret, Username};

/// Запись учётной записи в том виде, в каком её хранит хост оркестрации.
///
/// Пароль только принимается: при сериализации он не выводится. `db`
/// отсутствует или равен `-1`, если ограничения базы нет.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Option<Secret>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<i64>,
}

impl AccountRecord {
    pub fn new(
        username: impl Into<String>,
        password: Option<Secret>,
        db: Option<i64>,
    ) -> Self {
        Self {
            username: username.into(),
            password,
            db,
        }
    }

    /// Нормализует запись в желаемую учётную запись.
    ///
    /// Проверяет имя, требует пароль и переводит `db` в [`DatabaseScope`].
    /// Пустой пароль допустим: Redis хранит хеш пустой строки.
    pub fn to_account(&self) -> Result<Account, DirectoryError> {
        let username = Username::new(self.username.clone())?;
        let password = self
            .password
            .clone()
            .ok_or_else(|| DirectoryError::InvalidAccount {
                reason: "password is required".to_string(),
            })?;
        let scope = DatabaseScope::from_optional(self.db)?;
        Ok(Account::new(username, password, scope))
    }

    pub fn username(&self) -> Result<Username, DirectoryError> {
        Username::new(self.username.clone())
    }
}

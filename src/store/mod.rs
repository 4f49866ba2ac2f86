//! Абстракция ACL-хранилища.
//!
//! Каталог учётных записей работает только через [`AclStore`]. Живой Redis
//! реализован в [`redis`], хранилище в памяти с семантикой `ACL SETUSER`
//! в [`memory`].

use async_trait::async_trait;

use aclsync_error::{StoreError, StoreResult};

use crate::acl::Directive;

pub mod memory;
pub mod redis;

pub use memory::{EffectiveAcl, MemoryAclStore};
pub use self::redis::RedisAclStore;

/// Что хранилище знает о пользователе, как его возвращает `ACL GETUSER`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountDetail {
    pub flags: Vec<String>,
    pub commands: String,
    pub keys: Vec<String>,
    pub channels: Vec<String>,
}

/// Результат запроса учётной записи, разобранный один раз на границе
/// хранилища.
#[derive(Debug, Clone)]
pub enum AccountLookup {
    Found(AccountDetail),
    NotFound,
    QueryError(StoreError),
}

/// Одна операция пакета.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// `ACL DELUSER`; отсутствие пользователя не ошибка.
    Delete { username: String },
    /// `ACL SETUSER` с директивами в заданном порядке.
    Set {
        username: String,
        directives: Vec<Directive>,
    },
}

/// Хранилище ACL-пользователей.
#[async_trait]
pub trait AclStore: Send + Sync {
    /// `ACL GETUSER`
    async fn query_account(
        &self,
        username: &str,
    ) -> AccountLookup;

    /// `ACL SETUSER` с директивами по порядку.
    async fn set_account(
        &self,
        username: &str,
        directives: &[Directive],
    ) -> StoreResult<()>;

    /// `ACL DELUSER`
    async fn delete_account(
        &self,
        username: &str,
    ) -> StoreResult<()>;

    /// Отправляет операции одним обращением, строго по порядку.
    async fn batch(
        &self,
        ops: Vec<StoreOp>,
    ) -> StoreResult<()>;

    /// Имя бэкенда для логов.
    fn backend_name(&self) -> &'static str;
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl AccountDetail {
    /// Пустая запись не считается существующим пользователем.
    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
            && self.commands.is_empty()
            && self.keys.is_empty()
            && self.channels.is_empty()
    }
}

impl StoreOp {
    pub fn username(&self) -> &str {
        match self {
            Self::Delete { username } | Self::Set { username, .. } => username,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_detail() {
        assert!(AccountDetail::default().is_empty());
        let detail = AccountDetail {
            flags: vec!["off".into()],
            ..Default::default()
        };
        assert!(!detail.is_empty());
    }

    #[test]
    fn op_username() {
        let op = StoreOp::Set {
            username: "alice".into(),
            directives: vec![Directive::Enable],
        };
        assert_eq!(op.username(), "alice");
        assert_eq!(
            StoreOp::Delete {
                username: "bob".into()
            }
            .username(),
            "bob"
        );
    }
}

//! Адаптер жизненного цикла.
//!
//! Переводит события хоста оркестрации (declare, observe, modify, remove,
//! import) в вызовы [`AccountDirectory`] и превращает ошибки каталога в
//! диагностику, относящуюся к одной учётной записи.

pub mod diagnostic;
pub mod record;

pub use diagnostic::{Diagnostic, Severity};
pub use record::AccountRecord;

use aclsync_error::{DirectoryError, Operation};

use crate::cancel::Cancellation;
use crate::connection::Connection;
use crate::directory::AccountDirectory;

/// Адаптер между хостом оркестрации и каталогом учётных записей.
///
/// Создаётся ненастроенным; пока не вызван [`configure`](Self::configure),
/// каждый вызов возвращает диагностику `NotConfigured` и не обращается к
/// хранилищу.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerAdapter {
    directory: Option<AccountDirectory>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ReconcilerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Устанавливает соединение для всех последующих вызовов.
    pub fn configure(
        &mut self,
        conn: Connection,
    ) {
        tracing::debug!(?conn, "reconciler configured");
        self.directory = Some(AccountDirectory::new(conn));
    }

    pub fn is_configured(&self) -> bool {
        self.directory.is_some()
    }

    fn directory(
        &self,
        operation: Operation,
    ) -> Result<&AccountDirectory, Diagnostic> {
        self.directory
            .as_ref()
            .ok_or_else(|| Diagnostic::from_error(operation, &DirectoryError::NotConfigured, None))
    }

    /// Создаёт учётную запись по объявленной записи и возвращает её как
    /// новое состояние.
    pub async fn declare(
        &self,
        desired: AccountRecord,
        cancel: &Cancellation,
    ) -> Result<AccountRecord, Diagnostic> {
        let op = Operation::Create;
        let directory = self.directory(op)?;
        let account = desired
            .to_account()
            .map_err(|e| fail(op, &e, &desired))?;

        directory
            .create(&account, cancel)
            .await
            .map_err(|e| fail(op, &e, &desired))?;
        Ok(desired)
    }

    /// Возвращает прежнее состояние без обращения к хранилищу.
    ///
    /// Изменения, сделанные в обход aclsync (например, смена пароля),
    /// здесь не обнаруживаются.
    pub async fn observe(
        &self,
        prior: AccountRecord,
    ) -> Result<AccountRecord, Diagnostic> {
        self.directory(Operation::Read)?;
        Ok(prior)
    }

    /// Заменяет учётную запись новой версией.
    ///
    /// Если имя изменилось, после записи новой учётной записи прежняя
    /// удаляется. При ошибке прежнее состояние не восстанавливается.
    pub async fn modify(
        &self,
        desired: AccountRecord,
        prior: &AccountRecord,
        cancel: &Cancellation,
    ) -> Result<AccountRecord, Diagnostic> {
        let op = Operation::Update;
        let directory = self.directory(op)?;
        let account = desired
            .to_account()
            .map_err(|e| fail(op, &e, &desired))?;

        directory
            .replace(&account, cancel)
            .await
            .map_err(|e| fail(op, &e, &desired))?;

        if prior.username != desired.username {
            let old = prior.username().map_err(|e| fail(op, &e, &desired))?;
            tracing::info!(from = %old, to = %account.username, "username changed, removing old user");
            directory
                .delete(&old, cancel)
                .await
                .map_err(|e| fail(op, &e, &desired))?;
        }

        Ok(desired)
    }

    /// Удаляет учётную запись из прежнего состояния.
    pub async fn remove(
        &self,
        prior: &AccountRecord,
        cancel: &Cancellation,
    ) -> Result<(), Diagnostic> {
        let op = Operation::Delete;
        let directory = self.directory(op)?;
        let username = prior.username().map_err(|e| fail(op, &e, prior))?;

        directory
            .delete(&username, cancel)
            .await
            .map_err(|e| fail(op, &e, prior))
    }

    /// Принимает под управление пользователя, созданного вне aclsync.
    ///
    /// Профиль команд не проверяется и хранилище не запрашивается. Пароль
    /// неизвестен, база не ограничена.
    pub fn import(
        &self,
        id: &str,
    ) -> Result<AccountRecord, Diagnostic> {
        let op = Operation::Import;
        self.directory(op)?;
        let record = AccountRecord::new(id, None, None);
        record.username().map_err(|e| fail(op, &e, &record))?;
        Ok(record)
    }

    /// Проверка существования для хоста (CLI `exists`).
    pub async fn exists(
        &self,
        record: &AccountRecord,
        cancel: &Cancellation,
    ) -> Result<bool, Diagnostic> {
        let op = Operation::Read;
        let directory = self.directory(op)?;
        let username = record.username().map_err(|e| fail(op, &e, record))?;
        directory
            .exists(&username, cancel)
            .await
            .map_err(|e| fail(op, &e, record))
    }
}

fn fail(
    operation: Operation,
    err: &DirectoryError,
    record: &AccountRecord,
) -> Diagnostic {
    tracing::error!(
        %operation,
        username = %record.username,
        error = %err,
        "account operation failed"
    );
    Diagnostic::from_error(operation, err, record.password.as_ref())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aclsync_error::StatusCode;

    use super::*;
    use crate::store::MemoryAclStore;

    fn configured() -> (ReconcilerAdapter, MemoryAclStore) {
        let store = MemoryAclStore::new();
        let mut adapter = ReconcilerAdapter::new();
        adapter.configure(Connection::from_store(Arc::new(store.clone())));
        (adapter, store)
    }

    /// Тест проверяет, что ненастроенный адаптер отвечает `NotConfigured`
    /// на каждый вызов.
    #[tokio::test]
    async fn unconfigured_adapter() {
        let adapter = ReconcilerAdapter::new();
        let record = AccountRecord::new("alice", Some("pw".into()), None);
        let none = Cancellation::none();

        assert!(!adapter.is_configured());
        let d = adapter.declare(record.clone(), &none).await.unwrap_err();
        assert_eq!(d.status, StatusCode::NotConfigured);
        assert_eq!(d.summary, "Unable to create user");

        let d = adapter.observe(record.clone()).await.unwrap_err();
        assert_eq!(d.operation, Operation::Read);
        let d = adapter.modify(record.clone(), &record, &none).await.unwrap_err();
        assert_eq!(d.operation, Operation::Update);
        let d = adapter.remove(&record, &none).await.unwrap_err();
        assert_eq!(d.operation, Operation::Delete);
        assert!(adapter.import("alice").is_err());
    }

    #[tokio::test]
    async fn observe_is_pass_through() {
        let (adapter, store) = configured();
        store.fail_queries("should not be called").await;
        let prior = AccountRecord::new("alice", Some("pw".into()), Some(2));
        assert_eq!(adapter.observe(prior.clone()).await.unwrap(), prior);
    }

    #[tokio::test]
    async fn declare_invalid_record() {
        let (adapter, store) = configured();
        let d = adapter
            .declare(AccountRecord::new("alice", Some("pw".into()), Some(-3)), &Cancellation::none())
            .await
            .unwrap_err();
        assert_eq!(d.status, StatusCode::InvalidArgs);
        assert!(store.usernames().await.is_empty());
    }

    #[test]
    fn import_has_no_password() {
        let (adapter, _) = configured();
        let record = adapter.import("legacy").unwrap();
        assert_eq!(record, AccountRecord::new("legacy", None, None));
        assert!(adapter.import("").is_err());
    }
}

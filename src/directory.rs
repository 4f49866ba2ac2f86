//! Каталог учётных записей поверх ACL-хранилища.
//!
//! Проверка существования, создание, атомарная замена и удаление
//! пользователей. Каждая операция принимает [`Cancellation`]; обращение к
//! хранилищу прерывается при отмене или по дедлайну. Повторов нет: любая
//! ошибка сразу возвращается вызывающему.

use tracing::{info_span, Instrument};

use aclsync_error::{DirectoryError, Operation};

use crate::account::{Account, Username};
use crate::acl::profile_directives;
use crate::cancel::Cancellation;
use crate::connection::Connection;
use crate::store::{AccountLookup, StoreOp};

/// Каталог учётных записей.
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    conn: Connection,
}

impl AccountDirectory {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Существует ли пользователь.
    ///
    /// Отсутствие пользователя (`nil` или структурно пустой ответ) даёт
    /// `Ok(false)`. Если существование определить не удалось, возвращается
    /// `QueryFailed`, а не `false`.
    pub async fn exists(
        &self,
        username: &Username,
        cancel: &Cancellation,
    ) -> Result<bool, DirectoryError> {
        self.exists_for(Operation::Read, username, cancel)
            .instrument(info_span!("acl.exists", username = %username))
            .await
    }

    async fn exists_for(
        &self,
        operation: Operation,
        username: &Username,
        cancel: &Cancellation,
    ) -> Result<bool, DirectoryError> {
        let lookup = cancel
            .run(operation, self.conn.store().query_account(username.as_str()))
            .await?;

        match lookup {
            AccountLookup::Found(detail) if !detail.is_empty() => {
                tracing::debug!(flags = ?detail.flags, "user found");
                Ok(true)
            }
            AccountLookup::Found(_) | AccountLookup::NotFound => {
                tracing::debug!("user not found");
                Ok(false)
            }
            AccountLookup::QueryError(e) => {
                tracing::warn!(error = %e, "existence query failed");
                Err(DirectoryError::QueryFailed {
                    username: username.to_string(),
                    message: e.message(),
                })
            }
        }
    }

    /// Создаёт пользователя с фиксированным профилем.
    ///
    /// Если пользователь уже есть, ничего не пишет и возвращает
    /// `DuplicateAccount`. Между проверкой и записью нет блокировки.
    pub async fn create(
        &self,
        account: &Account,
        cancel: &Cancellation,
    ) -> Result<(), DirectoryError> {
        let span = info_span!("acl.create", username = %account.username, scope = %account.scope);
        async {
            if self
                .exists_for(Operation::Create, &account.username, cancel)
                .await?
            {
                tracing::warn!("refusing to create duplicate user");
                return Err(DirectoryError::DuplicateAccount {
                    username: account.username.to_string(),
                });
            }

            let directives = profile_directives(&account.password, account.scope);
            cancel
                .run(
                    Operation::Create,
                    self.conn
                        .store()
                        .set_account(account.username.as_str(), &directives),
                )
                .await?
                .map_err(|e| DirectoryError::StoreWriteFailed {
                    operation: Operation::Create,
                    message: e.message(),
                })?;

            tracing::info!(directives = directives.len(), "user created");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Заменяет пользователя: удаление и создание одним пакетом, удаление
    /// первым.
    ///
    /// Существование не проверяется ни в одну сторону. После ошибки пакета
    /// состояние пользователя не определено и повторно не запрашивается.
    pub async fn replace(
        &self,
        account: &Account,
        cancel: &Cancellation,
    ) -> Result<(), DirectoryError> {
        let span = info_span!("acl.replace", username = %account.username, scope = %account.scope);
        async {
            let username = account.username.to_string();
            let ops = vec![
                StoreOp::Delete {
                    username: username.clone(),
                },
                StoreOp::Set {
                    username,
                    directives: profile_directives(&account.password, account.scope),
                },
            ];

            cancel
                .run(Operation::Update, self.conn.store().batch(ops))
                .await?
                .map_err(|e| DirectoryError::StoreWriteFailed {
                    operation: Operation::Update,
                    message: e.message(),
                })?;

            tracing::info!("user replaced");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// Удаляет пользователя. Отсутствующий пользователь не ошибка.
    pub async fn delete(
        &self,
        username: &Username,
        cancel: &Cancellation,
    ) -> Result<(), DirectoryError> {
        async {
            cancel
                .run(
                    Operation::Delete,
                    self.conn.store().delete_account(username.as_str()),
                )
                .await?
                .map_err(|e| DirectoryError::StoreWriteFailed {
                    operation: Operation::Delete,
                    message: e.message(),
                })?;

            tracing::info!("user deleted");
            Ok(())
        }
        .instrument(info_span!("acl.delete", username = %username))
        .await
    }
}

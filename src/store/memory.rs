//! ACL-хранилище в памяти с семантикой Redis `ACL SETUSER`.
//!
//! Новые пользователи создаются выключенными и без прав, правила
//! применяются по порядку, недопустимое правило оставляет пользователя без
//! изменений. Пакет применяется целиком или не применяется вовсе.
//!
//! Помимо этого хранилище умеет имитировать отказы записи и запросов и
//! задержку, чтобы проверять обработку ошибок и отмену.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use aclsync_error::{StoreError, StoreResult};

use super::{AccountDetail, AccountLookup, AclStore, StoreOp};
use crate::acl::{parse_rules, render_tokens, AclUser, Directive};

/// Хранилище пользователей в памяти.
#[derive(Debug, Clone, Default)]
pub struct MemoryAclStore {
    users: Arc<RwLock<HashMap<String, AclUser>>>,
    faults: Arc<RwLock<Faults>>,
}

/// Итоговые права пользователя, вычисленные по применённым правилам.
#[derive(Debug, Clone)]
pub struct EffectiveAcl {
    user: AclUser,
}

#[derive(Debug, Default)]
struct Faults {
    write_error: Option<String>,
    query_error: Option<String>,
    latency: Option<Duration>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl MemoryAclStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Все последующие записи (set, delete, batch) завершаются ошибкой с
    /// этим текстом.
    pub async fn fail_writes(
        &self,
        message: impl Into<String>,
    ) {
        self.faults.write().await.write_error = Some(message.into());
    }

    /// Все последующие запросы возвращают `AccountLookup::QueryError`.
    pub async fn fail_queries(
        &self,
        message: impl Into<String>,
    ) {
        self.faults.write().await.query_error = Some(message.into());
    }

    /// Задержка перед каждым обращением. Изменение применяется после
    /// задержки, так что отменённая операция ничего не меняет.
    pub async fn set_latency(
        &self,
        latency: Duration,
    ) {
        self.faults.write().await.latency = Some(latency);
    }

    pub async fn clear_faults(&self) {
        *self.faults.write().await = Faults::default();
    }

    /// Применяет сырые токены `ACL SETUSER`, минуя каталог. Нужен, чтобы
    /// смоделировать пользователя, созданного вне aclsync.
    pub async fn setuser_tokens(
        &self,
        username: &str,
        tokens: &[&str],
    ) -> StoreResult<()> {
        let mut users = self.users.write().await;
        apply_tokens(&mut users, username, tokens)
    }

    /// Итоговые права пользователя или `None`, если его нет.
    pub async fn effective(
        &self,
        username: &str,
    ) -> Option<EffectiveAcl> {
        self.users
            .read()
            .await
            .get(username)
            .cloned()
            .map(|user| EffectiveAcl { user })
    }

    /// Эквивалент `AUTH username password`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> bool {
        self.users
            .read()
            .await
            .get(username)
            .is_some_and(|u| u.verify_password(password))
    }

    /// Имена пользователей в алфавитном порядке (`ACL USERS`).
    pub async fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.users.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn before_write(&self) -> StoreResult<()> {
        let (latency, error) = {
            let faults = self.faults.read().await;
            (faults.latency, faults.write_error.clone())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        match error {
            Some(message) => Err(StoreError::Transport { message }),
            None => Ok(()),
        }
    }
}

impl EffectiveAcl {
    /// Разрешена ли команда с такими аргументами.
    pub fn allows(
        &self,
        command: &str,
        args: &[&str],
    ) -> bool {
        self.user.check_command(command, args)
    }

    pub fn allows_key(
        &self,
        key: &str,
    ) -> bool {
        self.user.check_key(key)
    }

    pub fn allows_channel(
        &self,
        channel: &str,
    ) -> bool {
        self.user.check_channel(channel)
    }

    pub fn is_enabled(&self) -> bool {
        self.user.enabled
    }

    pub fn verify_password(
        &self,
        password: &str,
    ) -> bool {
        self.user.verify_password(password)
    }

    /// Описание пользователя в виде ответа `ACL GETUSER`.
    pub fn detail(&self) -> AccountDetail {
        AccountDetail {
            flags: self.user.flags(),
            commands: self.user.commands_description(),
            keys: self.user.key_patterns(),
            channels: self.user.channel_patterns(),
        }
    }
}

fn apply_tokens<S: AsRef<str>>(
    users: &mut HashMap<String, AclUser>,
    username: &str,
    tokens: &[S],
) -> StoreResult<()> {
    let rules = parse_rules(tokens).map_err(|e| StoreError::Rejected {
        message: e.to_string(),
    })?;
    let mut user = users
        .get(username)
        .cloned()
        .unwrap_or_else(|| AclUser::new(username));
    user.apply_rules(&rules).map_err(|e| StoreError::Rejected {
        message: e.to_string(),
    })?;
    users.insert(username.to_string(), user);
    Ok(())
}

fn apply_op(
    users: &mut HashMap<String, AclUser>,
    op: &StoreOp,
) -> StoreResult<()> {
    match op {
        StoreOp::Delete { username } => {
            users.remove(username);
            Ok(())
        }
        StoreOp::Set {
            username,
            directives,
        } => apply_tokens(users, username, &render_tokens(directives)),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация AclStore
////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl AclStore for MemoryAclStore {
    async fn query_account(
        &self,
        username: &str,
    ) -> AccountLookup {
        let (latency, error) = {
            let faults = self.faults.read().await;
            (faults.latency, faults.query_error.clone())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = error {
            return AccountLookup::QueryError(StoreError::Transport { message });
        }

        match self.effective(username).await {
            Some(acl) => AccountLookup::Found(acl.detail()),
            None => AccountLookup::NotFound,
        }
    }

    async fn set_account(
        &self,
        username: &str,
        directives: &[Directive],
    ) -> StoreResult<()> {
        self.before_write().await?;
        let mut users = self.users.write().await;
        apply_tokens(&mut users, username, &render_tokens(directives))
    }

    async fn delete_account(
        &self,
        username: &str,
    ) -> StoreResult<()> {
        self.before_write().await?;
        self.users.write().await.remove(username);
        Ok(())
    }

    async fn batch(
        &self,
        ops: Vec<StoreOp>,
    ) -> StoreResult<()> {
        self.before_write().await?;
        let mut users = self.users.write().await;
        let mut staged = users.clone();
        for op in &ops {
            apply_op(&mut staged, op)?;
        }
        *users = staged;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::{AclCategory, Directive};

    #[tokio::test]
    async fn set_then_query() {
        let store = MemoryAclStore::new();
        assert!(matches!(
            store.query_account("alice").await,
            AccountLookup::NotFound
        ));

        store
            .set_account("alice", &[Directive::Enable, Directive::AllKeys])
            .await
            .unwrap();

        let AccountLookup::Found(detail) = store.query_account("alice").await else {
            panic!("alice must exist");
        };
        assert_eq!(detail.flags, vec!["on"]);
        assert_eq!(detail.keys, vec!["~*"]);
        assert_eq!(detail.commands, "-@all");
    }

    /// Тест проверяет, что отклонённое правило не создаёт пользователя.
    #[tokio::test]
    async fn rejected_rule_does_not_create_user() {
        let store = MemoryAclStore::new();
        let err = store
            .setuser_tokens("alice", &["on", "+frobnicate"])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(store.effective("alice").await.is_none());
    }

    /// Тест проверяет атомарность пакета: ошибка во второй операции
    /// откатывает первую.
    #[tokio::test]
    async fn batch_is_all_or_nothing() {
        let store = MemoryAclStore::new();
        store.setuser_tokens("alice", &["on", ">pw"]).await.unwrap();

        let err = store
            .batch(vec![
                StoreOp::Delete {
                    username: "alice".into(),
                },
                StoreOp::Set {
                    username: "alice".into(),
                    directives: vec![Directive::AllowCommand("frobnicate")],
                },
            ])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert!(store.authenticate("alice", "pw").await);

        store.fail_writes("ERR connection reset").await;
        let err = store
            .batch(vec![StoreOp::Delete {
                username: "alice".into(),
            }])
            .await
            .unwrap_err();
        assert_eq!(err.message(), "ERR connection reset");
        assert!(store.effective("alice").await.is_some());

        store.clear_faults().await;
        store
            .batch(vec![
                StoreOp::Delete {
                    username: "alice".into(),
                },
                StoreOp::Set {
                    username: "alice".into(),
                    directives: vec![Directive::AllowCategory(AclCategory::All)],
                },
            ])
            .await
            .unwrap();
        let acl = store.effective("alice").await.unwrap();
        // Пользователь пересоздан: прежний `on` и пароль потеряны.
        assert!(!acl.is_enabled());
        assert!(!store.authenticate("alice", "pw").await);
    }

    #[tokio::test]
    async fn delete_absent_is_noop() {
        let store = MemoryAclStore::new();
        store.delete_account("ghost").await.unwrap();
        assert!(store.usernames().await.is_empty());
    }

    #[tokio::test]
    async fn query_failure_is_reported() {
        let store = MemoryAclStore::new();
        store.fail_queries("NOPERM this user has no permissions").await;
        match store.query_account("alice").await {
            AccountLookup::QueryError(e) => assert!(e.message().contains("NOPERM")),
            other => panic!("unexpected lookup: {other:?}"),
        }
    }

    #[tokio::test]
    async fn authenticate_checks_hash() {
        let store = MemoryAclStore::new();
        store
            .set_account(
                "bob",
                &[Directive::SetPassword("s3cret".into()), Directive::Enable],
            )
            .await
            .unwrap();
        assert!(store.authenticate("bob", "s3cret").await);
        assert!(!store.authenticate("bob", "wrong").await);
        assert!(!store.authenticate("nobody", "s3cret").await);
    }
}

use std::{sync::Arc, time::Duration};

use aclsync::{
    Account, AccountDirectory, CancelHandle, CancelReason, Cancellation, Connection,
    DatabaseScope, DirectoryError, MemoryAclStore, Operation, Secret, Username, DENIED_COMMANDS,
};
use anyhow::Result;
use proptest::prelude::*;

fn setup() -> (AccountDirectory, MemoryAclStore) {
    let store = MemoryAclStore::new();
    let conn = Connection::from_store(Arc::new(store.clone()));
    (AccountDirectory::new(conn), store)
}

fn name(s: &str) -> Username {
    Username::new(s).unwrap()
}

fn account(
    user: &str,
    pw: &str,
    scope: DatabaseScope,
) -> Account {
    Account::new(name(user), Secret::new(pw), scope)
}

/// Тест проверяет, что для отсутствующего пользователя `exists` возвращает
/// `false` без ошибки.
#[tokio::test]
async fn absent_user_does_not_exist() -> Result<()> {
    let (dir, _) = setup();
    assert!(!dir.exists(&name("ghost"), &Cancellation::none()).await?);
    Ok(())
}

/// Тест проверяет, что после `create` пользователь существует.
#[tokio::test]
async fn create_then_exists() -> Result<()> {
    let (dir, _) = setup();
    let none = Cancellation::none();
    dir.create(&account("alice", "pw1", DatabaseScope::Unrestricted), &none)
        .await?;
    assert!(dir.exists(&name("alice"), &none).await?);
    Ok(())
}

/// Тест проверяет, что повторный `create` даёт `DuplicateAccount` и не
/// меняет хранилище.
#[tokio::test]
async fn second_create_is_duplicate() -> Result<()> {
    let (dir, store) = setup();
    let none = Cancellation::none();
    dir.create(&account("alice", "pw1", DatabaseScope::Unrestricted), &none)
        .await?;
    let before = store.effective("alice").await.unwrap().detail();

    let err = dir
        .create(&account("alice", "pw2", DatabaseScope::Index(3)), &none)
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::DuplicateAccount { ref username } if username == "alice"));

    let after = store.effective("alice").await.unwrap();
    assert_eq!(after.detail(), before);
    assert!(after.verify_password("pw1"));
    assert!(!after.verify_password("pw2"));
    Ok(())
}

/// Тест проверяет, что `replace` существующего пользователя применяет новые
/// пароль и область.
#[tokio::test]
async fn replace_existing_applies_new_scope() -> Result<()> {
    let (dir, store) = setup();
    let none = Cancellation::none();
    dir.create(&account("alice", "pw1", DatabaseScope::Unrestricted), &none)
        .await?;
    dir.replace(&account("alice", "pw2", DatabaseScope::Index(5)), &none)
        .await?;

    assert!(dir.exists(&name("alice"), &none).await?);
    let acl = store.effective("alice").await.unwrap();
    assert!(acl.allows("select", &["5"]));
    assert!(!acl.allows("select", &["0"]));
    assert!(store.authenticate("alice", "pw2").await);
    assert!(!store.authenticate("alice", "pw1").await);
    Ok(())
}

/// Тест проверяет, что `replace` отсутствующего пользователя создаёт его.
#[tokio::test]
async fn replace_absent_creates() -> Result<()> {
    let (dir, store) = setup();
    let none = Cancellation::none();
    dir.replace(&account("bob", "pw", DatabaseScope::Unrestricted), &none)
        .await?;
    assert!(dir.exists(&name("bob"), &none).await?);
    assert!(store.effective("bob").await.unwrap().is_enabled());
    Ok(())
}

/// Тест проверяет удаление существующего и отсутствующего пользователя.
#[tokio::test]
async fn delete_is_idempotent() -> Result<()> {
    let (dir, _) = setup();
    let none = Cancellation::none();
    dir.create(&account("alice", "pw", DatabaseScope::Unrestricted), &none)
        .await?;
    dir.delete(&name("alice"), &none).await?;
    assert!(!dir.exists(&name("alice"), &none).await?);
    dir.delete(&name("alice"), &none).await?;
    Ok(())
}

/// Тест проверяет, что без ограничения SELECT разрешён для любой базы.
#[tokio::test]
async fn unrestricted_scope_allows_any_select() -> Result<()> {
    let (dir, store) = setup();
    dir.create(
        &account("alice", "pw", DatabaseScope::Unrestricted),
        &Cancellation::none(),
    )
    .await?;

    let acl = store.effective("alice").await.unwrap();
    for db in ["0", "1", "3", "15"] {
        assert!(acl.allows("select", &[db]), "select {db} must be allowed");
    }
    assert!(!acl.detail().commands.contains("select"));
    Ok(())
}

/// Тест проверяет, что при `Index(3)` SELECT разрешён только для базы 3.
#[tokio::test]
async fn restricted_scope_allows_only_its_index() -> Result<()> {
    let (dir, store) = setup();
    dir.create(
        &account("alice", "pw", DatabaseScope::Index(3)),
        &Cancellation::none(),
    )
    .await?;

    let acl = store.effective("alice").await.unwrap();
    assert!(acl.allows("select", &["3"]));
    for db in ["0", "1", "2", "4", "15"] {
        assert!(!acl.allows("select", &[db]), "select {db} must be denied");
    }
    assert!(acl.allows("set", &["k", "v"]));
    Ok(())
}

/// Тест проверяет, что административные команды запрещены для любого
/// созданного пользователя.
#[tokio::test]
async fn admin_commands_denied() -> Result<()> {
    let (dir, store) = setup();
    let none = Cancellation::none();
    dir.create(&account("a", "pw", DatabaseScope::Unrestricted), &none)
        .await?;
    dir.create(&account("b", "pw", DatabaseScope::Index(0)), &none)
        .await?;

    for user in ["a", "b"] {
        let acl = store.effective(user).await.unwrap();
        for cmd in DENIED_COMMANDS {
            assert!(!acl.allows(cmd, &[]), "{cmd} must be denied for {user}");
            assert!(!acl.allows(&cmd.to_uppercase(), &["x"]));
        }
        assert!(acl.allows("get", &["k"]));
        assert!(acl.allows_key("any:key"));
        assert!(acl.allows_channel("any-channel"));
    }
    Ok(())
}

/// Тест проверяет, что профиль запрещает только короткий список команд:
/// команды, которых нет в таблице категорий, остаются разрешены.
#[tokio::test]
async fn profile_allows_commands_outside_deny_list() -> Result<()> {
    let (dir, store) = setup();
    let none = Cancellation::none();
    dir.create(&account("a", "pw", DatabaseScope::Unrestricted), &none)
        .await?;
    dir.create(&account("b", "pw", DatabaseScope::Index(3)), &none)
        .await?;

    for user in ["a", "b"] {
        let acl = store.effective(user).await.unwrap();
        for cmd in ["xadd", "hdel", "append", "unlink", "type", "getrange", "XLEN"] {
            assert!(acl.allows(cmd, &["k"]), "{cmd} must be allowed for {user}");
        }
    }
    Ok(())
}

/// Тест проверяет, что отменённый `create` возвращает `Cancelled`, а
/// пользователь либо создан полностью, либо отсутствует.
#[tokio::test(start_paused = true)]
async fn cancelled_create_is_all_or_nothing() -> Result<()> {
    let (dir, store) = setup();
    store.set_latency(Duration::from_millis(100)).await;

    let handle = CancelHandle::new();
    let token = handle.token();
    let target = account("alice", "pw", DatabaseScope::Index(2));

    let create = {
        let dir = dir.clone();
        tokio::spawn(async move { dir.create(&target, &token).await })
    };
    // Запрос существования уже прошёл, запись ещё нет.
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.cancel();

    let err = create.await?.unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::Cancelled {
            operation: Operation::Create,
            reason: CancelReason::Cancelled
        }
    ));

    store.clear_faults().await;
    // Запись была прервана до применения: пользователя нет целиком.
    let exists = dir.exists(&name("alice"), &Cancellation::none()).await?;
    assert!(!exists);
    assert!(store.effective("alice").await.is_none());
    Ok(())
}

/// Тест проверяет, что истёкший дедлайн не превращается в
/// `DuplicateAccount`.
#[tokio::test(start_paused = true)]
async fn deadline_during_exists_check() -> Result<()> {
    let (dir, store) = setup();
    store.set_latency(Duration::from_secs(10)).await;

    let deadline = Cancellation::none().with_timeout(Duration::from_secs(1));
    let err = dir
        .create(&account("alice", "pw", DatabaseScope::Unrestricted), &deadline)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DirectoryError::Cancelled {
            reason: CancelReason::DeadlineExceeded,
            ..
        }
    ));
    store.clear_faults().await;
    assert!(store.effective("alice").await.is_none());
    Ok(())
}

/// Тест проверяет, что ошибка пакета при `replace` сообщается как
/// `StoreWriteFailed` с текстом хранилища.
#[tokio::test]
async fn replace_batch_failure() -> Result<()> {
    let (dir, store) = setup();
    store.fail_writes("MISCONF Errors writing to disk").await;
    let err = dir
        .replace(
            &account("alice", "pw", DatabaseScope::Unrestricted),
            &Cancellation::none(),
        )
        .await
        .unwrap_err();
    match err {
        DirectoryError::StoreWriteFailed { operation, message } => {
            assert_eq!(operation, Operation::Update);
            assert_eq!(message, "MISCONF Errors writing to disk");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Для любого индекса базы: SELECT разрешён ровно для этого индекса, а
    /// административные команды запрещены.
    #[test]
    fn scope_is_enforced_for_any_index(db in 0u32..1024, other in 0u32..1024) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let (dir, store) = setup();
            dir.create(&account("u", "pw", DatabaseScope::Index(db)), &Cancellation::none())
                .await
                .unwrap();
            let acl = store.effective("u").await.unwrap();
            let db_arg = db.to_string();
            let other_arg = other.to_string();
            prop_assert!(acl.allows("select", &[db_arg.as_str()]));
            prop_assert_eq!(acl.allows("select", &[other_arg.as_str()]), db == other);
            for cmd in DENIED_COMMANDS {
                prop_assert!(!acl.allows(cmd, &[]));
            }
            Ok(())
        })?;
    }
}

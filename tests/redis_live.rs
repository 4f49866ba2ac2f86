//! Проверки против живого Redis (6.0+).
//!
//! Запуск: `ACLSYNC_TEST_REDIS_HOST=127.0.0.1 cargo test --test redis_live -- --ignored`.
//! Подключение должно иметь право на `ACL SETUSER` / `ACL DELUSER`.

use aclsync::{
    Account, AccountDirectory, Cancellation, Connection, ConnectionParams, DatabaseScope,
    DirectoryError, Secret, Username,
};
use anyhow::Result;
use serial_test::serial;

fn params() -> Option<ConnectionParams> {
    let host = std::env::var("ACLSYNC_TEST_REDIS_HOST").ok()?;
    let mut params = ConnectionParams::new(host).with_credentials(
        std::env::var("ACLSYNC_TEST_REDIS_USERNAME").ok(),
        std::env::var("ACLSYNC_TEST_REDIS_PASSWORD").ok().map(Secret::new),
    );
    if let Some(port) = std::env::var("ACLSYNC_TEST_REDIS_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
    {
        params = params.with_port(port);
    }
    Some(params)
}

async fn directory() -> Result<Option<AccountDirectory>> {
    let Some(params) = params() else {
        eprintln!("ACLSYNC_TEST_REDIS_HOST is not set, skipping");
        return Ok(None);
    };
    let conn = Connection::establish(&params).await?;
    Ok(Some(AccountDirectory::new(conn)))
}

fn name(s: &str) -> Username {
    Username::new(s).unwrap()
}

#[tokio::test]
#[ignore]
#[serial]
async fn live_lifecycle() -> Result<()> {
    let Some(dir) = directory().await? else {
        return Ok(());
    };
    let none = Cancellation::none();
    let user = name("aclsync_test_lifecycle");
    dir.delete(&user, &none).await?;

    assert!(!dir.exists(&user, &none).await?);
    dir.create(
        &Account::new(user.clone(), Secret::new("pw-1"), DatabaseScope::Index(2)),
        &none,
    )
    .await?;
    assert!(dir.exists(&user, &none).await?);

    let err = dir
        .create(
            &Account::new(user.clone(), Secret::new("pw-1"), DatabaseScope::Index(2)),
            &none,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::DuplicateAccount { .. }));

    dir.replace(
        &Account::new(user.clone(), Secret::new("pw-2"), DatabaseScope::Unrestricted),
        &none,
    )
    .await?;
    assert!(dir.exists(&user, &none).await?);

    dir.delete(&user, &none).await?;
    assert!(!dir.exists(&user, &none).await?);
    dir.delete(&user, &none).await?;
    Ok(())
}

/// Тест проверяет, что созданный пользователь может выполнить SELECT только
/// для своей базы, а CONFIG ему запрещён.
#[tokio::test]
#[ignore]
#[serial]
async fn live_scope_is_enforced() -> Result<()> {
    let Some(dir) = directory().await? else {
        return Ok(());
    };
    let Some(admin) = params() else {
        return Ok(());
    };
    let none = Cancellation::none();
    let user = name("aclsync_test_scope");
    dir.delete(&user, &none).await?;
    dir.create(
        &Account::new(user.clone(), Secret::new("scope-pw"), DatabaseScope::Index(3)),
        &none,
    )
    .await?;

    let info = redis::ConnectionInfo {
        addr: redis::ConnectionAddr::Tcp(admin.host.clone(), admin.port()),
        redis: redis::RedisConnectionInfo {
            username: Some(user.to_string()),
            password: Some("scope-pw".into()),
            ..Default::default()
        },
    };
    let client = redis::Client::open(info)?;
    let mut conn = client.get_multiplexed_async_connection().await?;

    let ok: redis::RedisResult<()> = redis::cmd("SELECT").arg(3).query_async(&mut conn).await;
    assert!(ok.is_ok());
    let denied: redis::RedisResult<()> = redis::cmd("SELECT").arg(0).query_async(&mut conn).await;
    assert!(denied.is_err());
    let config: redis::RedisResult<redis::Value> = redis::cmd("CONFIG")
        .arg("GET")
        .arg("maxmemory")
        .query_async(&mut conn)
        .await;
    assert!(config.is_err());

    dir.delete(&user, &none).await?;
    Ok(())
}

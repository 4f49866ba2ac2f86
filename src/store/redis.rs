//! Живое ACL-хранилище поверх Redis.
//!
//! Использует `redis::aio::ConnectionManager`: он клонируется дёшево,
//! мультиплексирует запросы и сам переподключается, поэтому один экземпляр
//! обслуживает все операции сессии.

use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{
    Client, ConnectionAddr, ConnectionInfo, ErrorKind, RedisConnectionInfo, RedisError, Value,
};

use aclsync_error::{StoreError, StoreResult};

use super::{AccountDetail, AccountLookup, AclStore, StoreOp};
use crate::acl::{render_tokens, Directive};
use crate::connection::ConnectionParams;

/// ACL-хранилище на живом сервере Redis.
#[derive(Clone)]
pub struct RedisAclStore {
    conn: ConnectionManager,
    endpoint: String,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl RedisAclStore {
    /// Устанавливает соединение и проходит аутентификацию.
    pub async fn connect(params: &ConnectionParams) -> StoreResult<Self> {
        let info = ConnectionInfo {
            addr: ConnectionAddr::Tcp(params.host.clone(), params.port()),
            redis: RedisConnectionInfo {
                username: params.username.clone(),
                password: params.password.as_ref().map(|p| p.expose().to_string()),
                ..Default::default()
            },
        };
        let client = Client::open(info).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;

        Ok(Self {
            conn,
            endpoint: params.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Разбирает ответ `ACL GETUSER`.
///
/// Redis 6 отвечает плоским массивом `[name, value, ...]` (RESP2), при RESP3
/// приходит отображение. `nil` и пустой ответ означают отсутствие
/// пользователя.
pub fn parse_getuser_reply(reply: Value) -> AccountLookup {
    let pairs: Vec<(Value, Value)> = match reply {
        Value::Nil => return AccountLookup::NotFound,
        Value::Map(pairs) => pairs,
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return AccountLookup::QueryError(StoreError::UnexpectedReply {
                    reply: format!("odd-length ACL GETUSER array ({} items)", items.len()),
                });
            }
            let mut pairs = Vec::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                pairs.push((k, v));
            }
            pairs
        }
        other => {
            return AccountLookup::QueryError(StoreError::UnexpectedReply {
                reply: format!("{other:?}"),
            })
        }
    };

    let mut detail = AccountDetail::default();
    for (key, value) in pairs {
        let Some(key) = value_to_string(&key) else {
            continue;
        };
        match key.as_str() {
            "flags" => detail.flags = value_to_list(&value),
            "commands" => detail.commands = value_to_string(&value).unwrap_or_default(),
            "keys" => detail.keys = value_to_list(&value),
            "channels" => detail.channels = value_to_list(&value),
            // passwords, selectors и прочее для проверки существования не нужны.
            _ => {}
        }
    }

    if detail.is_empty() {
        AccountLookup::NotFound
    } else {
        AccountLookup::Found(detail)
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::BulkString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        Value::SimpleString(s) => Some(s.clone()),
        Value::VerbatimString { text, .. } => Some(text.clone()),
        Value::Okay => Some("OK".to_string()),
        Value::Int(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Список строк: массив/множество (Redis 6) или строка через пробел
/// (Redis 7 отдаёт `keys` и `channels` одной строкой).
fn value_to_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) | Value::Set(items) => items.iter().filter_map(value_to_string).collect(),
        Value::Nil => Vec::new(),
        other => value_to_string(other)
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default(),
    }
}

/// Переводит ошибку `redis` в ошибку границы хранилища.
pub fn map_redis_error(err: RedisError) -> StoreError {
    let message = err.to_string();

    if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() || err.is_timeout()
    {
        return StoreError::Transport { message };
    }

    match err.kind() {
        ErrorKind::AuthenticationFailed => StoreError::Auth { message },
        ErrorKind::TypeError => StoreError::UnexpectedReply { reply: message },
        ErrorKind::ResponseError | ErrorKind::ExtensionError => match err.code() {
            Some("NOPERM") | Some("WRONGPASS") | Some("NOAUTH") => StoreError::Auth { message },
            _ => StoreError::Rejected { message },
        },
        _ => StoreError::Transport { message },
    }
}

////////////////////////////////////////////////////////////////////////////////
// Реализация AclStore
////////////////////////////////////////////////////////////////////////////////

#[async_trait]
impl AclStore for RedisAclStore {
    async fn query_account(
        &self,
        username: &str,
    ) -> AccountLookup {
        let mut conn = self.conn.clone();
        let reply: Result<Value, RedisError> = redis::cmd("ACL")
            .arg("GETUSER")
            .arg(username)
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(value) => parse_getuser_reply(value),
            Err(e) => AccountLookup::QueryError(map_redis_error(e)),
        }
    }

    async fn set_account(
        &self,
        username: &str,
        directives: &[Directive],
    ) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("ACL")
            .arg("SETUSER")
            .arg(username)
            .arg(render_tokens(directives))
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn delete_account(
        &self,
        username: &str,
    ) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        // DELUSER возвращает число удалённых пользователей; 0 не ошибка.
        let _: i64 = redis::cmd("ACL")
            .arg("DELUSER")
            .arg(username)
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    async fn batch(
        &self,
        ops: Vec<StoreOp>,
    ) -> StoreResult<()> {
        let mut pipe = redis::pipe();
        pipe.atomic();
        for op in &ops {
            match op {
                StoreOp::Delete { username } => {
                    pipe.cmd("ACL").arg("DELUSER").arg(username).ignore();
                }
                StoreOp::Set {
                    username,
                    directives,
                } => {
                    pipe.cmd("ACL")
                        .arg("SETUSER")
                        .arg(username)
                        .arg(render_tokens(directives))
                        .ignore();
                }
            }
        }

        let mut conn = self.conn.clone();
        let _: () = pipe
            .query_async(&mut conn)
            .await
            .map_err(map_redis_error)?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for RedisAclStore {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("RedisAclStore")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

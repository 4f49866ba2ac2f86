use std::fmt;
use std::sync::Arc;

use serde::Deserialize;

use aclsync_error::StoreResult;

use crate::account::Secret;
use crate::store::{AclStore, RedisAclStore};

/// Стандартный порт Redis.
pub const DEFAULT_PORT: u16 = 6379;

/// Параметры подключения к ACL-хранилищу.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    /// Если не задан, используется [`DEFAULT_PORT`].
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<Secret>,
}

/// Установленное соединение с ACL-хранилищем.
///
/// Создаётся один раз на сессию и клонируется в каждую операцию каталога.
/// Клонирование разделяет одно и то же хранилище.
#[derive(Clone)]
pub struct Connection {
    store: Arc<dyn AclStore>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ConnectionParams {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            username: None,
            password: None,
        }
    }

    pub fn with_port(
        mut self,
        port: u16,
    ) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(
        mut self,
        username: Option<String>,
        password: Option<Secret>,
    ) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Порт с учётом значения по умолчанию.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// `host:port` для логов.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }
}

impl Connection {
    /// Подключается к живому Redis.
    pub async fn establish(params: &ConnectionParams) -> StoreResult<Self> {
        let store = RedisAclStore::connect(params).await?;
        tracing::info!(
            endpoint = %params.endpoint(),
            username = params.username.as_deref().unwrap_or("default"),
            "connected to ACL store"
        );
        Ok(Self::from_store(Arc::new(store)))
    }

    /// Соединение поверх произвольного хранилища (например,
    /// [`MemoryAclStore`](crate::store::MemoryAclStore)).
    pub fn from_store(store: Arc<dyn AclStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &dyn AclStore {
        self.store.as_ref()
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Debug for Connection {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Connection")
            .field("backend", &self.store.backend_name())
            .finish()
    }
}

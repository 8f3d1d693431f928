//! Redis cache backend.
//!
//! Lifecycle: [`RedisBackend::connect`] tries to open a connection manager at
//! startup. When Redis is unreachable the backend still starts; every
//! operation then fails fast with [`CacheError::Unavailable`] until the
//! reconnect backoff elapses and a new connection attempt succeeds. Once a
//! manager exists it reconnects on its own after transport errors.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use super::backend::{CacheBackend, CacheError};

const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Default)]
struct ConnectionState {
    manager: Option<ConnectionManager>,
    retry_after: Option<Instant>,
}

pub struct RedisBackend {
    client: Client,
    operation_timeout: Duration,
    state: Mutex<ConnectionState>,
}

impl RedisBackend {
    /// Build the backend without connecting.
    pub fn new(url: &str, operation_timeout: Duration) -> Result<Self, CacheError> {
        let client = Client::open(url).map_err(CacheError::unavailable)?;
        Ok(Self {
            client,
            operation_timeout,
            state: Mutex::new(ConnectionState::default()),
        })
    }

    /// Build the backend and make a first connection attempt.
    ///
    /// A failed attempt is logged and leaves the backend in degraded mode.
    pub async fn connect(url: &str, operation_timeout: Duration) -> Result<Self, CacheError> {
        let backend = Self::new(url, operation_timeout)?;
        match backend.connection().await {
            Ok(_) => info!(backend = "redis", "Cache backend connected"),
            Err(err) => warn!(
                backend = "redis",
                error = %err,
                "Cache backend unreachable at startup; continuing without cache"
            ),
        }
        Ok(backend)
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let mut state = self.state.lock().await;
        if let Some(manager) = state.manager.as_ref() {
            return Ok(manager.clone());
        }
        if let Some(retry_after) = state.retry_after {
            if Instant::now() < retry_after {
                return Err(CacheError::unavailable("reconnect backoff in effect"));
            }
        }

        let attempt = timeout(
            self.operation_timeout,
            self.client.get_connection_manager(),
        )
        .await;
        match attempt {
            Ok(Ok(manager)) => {
                state.manager = Some(manager.clone());
                state.retry_after = None;
                Ok(manager)
            }
            Ok(Err(err)) => {
                state.retry_after = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(CacheError::unavailable(err))
            }
            Err(_) => {
                state.retry_after = Some(Instant::now() + RECONNECT_BACKOFF);
                Err(CacheError::Timeout)
            }
        }
    }

    async fn bounded<T, F>(&self, operation: F) -> Result<T, CacheError>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        timeout(self.operation_timeout, operation)
            .await
            .map_err(|_| CacheError::Timeout)?
            .map_err(CacheError::backend)
    }
}

#[async_trait]
impl CacheBackend for RedisBackend {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.get::<_, Option<String>>(key)).await
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        self.bounded(conn.set_ex::<_, _, ()>(key, value, seconds))
            .await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        self.bounded(conn.del::<_, ()>(key)).await
    }
}

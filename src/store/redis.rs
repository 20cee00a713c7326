//! Redis-backed counter store.
//!
//! Every trait method is one pipelined round trip over a shared
//! [`ConnectionManager`], which reconnects on its own after failures. Each
//! call is bounded by the configured timeout.

use ::redis::aio::ConnectionManager;
use ::redis::{cmd, pipe, Client};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use super::{ttl_secs, CounterStore, StoreError, StoreResult};

/// Counter store talking to a shared Redis instance.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    timeout: Duration,
}

impl RedisStore {
    /// Open a managed connection. Fails if the first connection cannot be
    /// established within the timeout.
    pub async fn connect(url: &str, command_timeout: Duration) -> StoreResult<Self> {
        let client = Client::open(url)?;
        let conn = match timeout(command_timeout, client.get_connection_manager()).await {
            Ok(conn) => conn?,
            Err(_) => return Err(StoreError::Timeout(command_timeout)),
        };
        tracing::info!(timeout_ms = command_timeout.as_millis() as u64, "Connected to redis counter store");
        Ok(Self {
            conn,
            timeout: command_timeout,
        })
    }

    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: Future<Output = ::redis::RedisResult<T>>,
    {
        match timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> StoreResult<i64> {
        let mut conn = self.conn.clone();
        let (count,): (i64,) = self
            .bounded(
                pipe()
                    .cmd("INCR")
                    .arg(key)
                    .cmd("EXPIRE")
                    .arg(key)
                    .arg(ttl_secs(ttl))
                    .arg("NX")
                    .ignore()
                    .query_async(&mut conn),
            )
            .await?;
        Ok(count)
    }

    async fn incr_and_get(
        &self,
        key: &str,
        ttl: Duration,
        read_key: &str,
    ) -> StoreResult<(i64, Option<i64>)> {
        let mut conn = self.conn.clone();
        self.bounded(
            pipe()
                .cmd("INCR")
                .arg(key)
                .cmd("EXPIRE")
                .arg(key)
                .arg(ttl_secs(ttl))
                .arg("NX")
                .ignore()
                .cmd("GET")
                .arg(read_key)
                .query_async(&mut conn),
        )
        .await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        self.bounded(cmd("GET").arg(key).query_async(&mut conn)).await
    }

    async fn get_pair(&self, first: &str, second: &str) -> StoreResult<(Option<i64>, Option<i64>)> {
        let mut conn = self.conn.clone();
        self.bounded(
            pipe()
                .cmd("GET")
                .arg(first)
                .cmd("GET")
                .arg(second)
                .query_async(&mut conn),
        )
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        self.bounded(
            cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl_secs(ttl))
                .query_async(&mut conn),
        )
        .await
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        // Nil reply means the key already existed.
        let reply: Option<String> = self
            .bounded(
                cmd("SET")
                    .arg(key)
                    .arg(value)
                    .arg("NX")
                    .arg("EX")
                    .arg(ttl_secs(ttl))
                    .query_async(&mut conn),
            )
            .await?;
        Ok(reply.is_some())
    }
}

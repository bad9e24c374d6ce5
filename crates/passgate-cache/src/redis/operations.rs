//! [`CacheProvider`] over Redis strings.
//!
//! Writes use `PSETEX` so the expiry is set in the same command as the
//! value; a marker is never visible without its TTL.

use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, RedisError};

use passgate_core::error::{AppError, ErrorKind};
use passgate_core::result::AppResult;
use passgate_core::traits::cache::CacheProvider;

use super::client::RedisClient;

#[derive(Debug, Clone)]
pub struct RedisCacheProvider {
    client: RedisClient,
}

impl RedisCacheProvider {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

fn failed(command: &'static str) -> impl FnOnce(RedisError) -> AppError {
    move |e| AppError::with_source(ErrorKind::Cache, format!("Redis {command} failed"), e)
}

/// `PSETEX` rejects 0, so sub-millisecond TTLs round up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn_mut();
        conn.get(self.client.prefixed_key(key))
            .await
            .map_err(failed("GET"))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        conn.pset_ex(self.client.prefixed_key(key), value, ttl_millis(ttl))
            .await
            .map_err(failed("PSETEX"))
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        let mut conn = self.client.conn_mut();
        conn.del(self.client.prefixed_key(key))
            .await
            .map_err(failed("DEL"))
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        conn.exists(self.client.prefixed_key(key))
            .await
            .map_err(failed("EXISTS"))
    }

    async fn health_check(&self) -> AppResult<bool> {
        let mut conn = self.client.conn_mut();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(failed("PING"))?;
        Ok(reply == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_never_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_micros(300)), 1);
        assert_eq!(ttl_millis(Duration::from_secs(900)), 900_000);
    }
}

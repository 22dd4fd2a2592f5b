//! Redis key-value module for the Shelfmark directory
//!
//! This module provides functionality for connecting to redis and performing
//! the key-value operations the document store is built on: get, set,
//! delete, and key enumeration for backup-slot pruning.

use anyhow::Result;
use redis::{AsyncCommands, Client};
use tracing::info;

use crate::error::{StorageError, StorageResult};

/// Configuration for the redis connection
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379")
    pub url: String,
}

impl RedisConfig {
    /// Create a new RedisConfig from environment variables
    ///
    /// # Environment Variables
    /// - `REDIS_URL`: Redis connection URL (default: "redis://localhost:6379")
    pub fn from_env() -> Result<Self> {
        let url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        Ok(RedisConfig { url })
    }
}

/// Redis connection handle used by the document store
#[derive(Clone)]
pub struct RedisPool {
    client: Client,
}

impl RedisPool {
    /// Initialize a new redis connection handle
    pub async fn new(config: &RedisConfig) -> StorageResult<Self> {
        let client = Client::open(config.url.clone()).map_err(StorageError::Connection)?;
        info!("Redis client initialized with URL: {}", config.url);
        Ok(RedisPool { client })
    }

    async fn get_connection(&self) -> StorageResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(StorageError::Connection)
    }

    /// Set a key-value pair
    pub async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut conn = self.get_connection().await?;
        let _: () = conn.set(key, value).await.map_err(StorageError::Command)?;
        Ok(())
    }

    /// Get a value by key
    pub async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(key).await.map_err(StorageError::Command)?;
        Ok(value)
    }

    /// Delete a key
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut conn = self.get_connection().await?;
        let _: u64 = conn.del(key).await.map_err(StorageError::Command)?;
        Ok(())
    }

    /// List all keys matching a glob pattern
    pub async fn keys(&self, pattern: &str) -> StorageResult<Vec<String>> {
        let mut conn = self.get_connection().await?;
        let keys: Vec<String> = conn.keys(pattern).await.map_err(StorageError::Command)?;
        Ok(keys)
    }

    /// Check if redis is reachable
    pub async fn health_check(&self) -> StorageResult<bool> {
        let mut conn = self.get_connection().await?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(StorageError::Command)?;
        Ok(pong == "PONG")
    }
}

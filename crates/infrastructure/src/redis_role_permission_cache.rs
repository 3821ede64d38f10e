//! Redis-backed role permission cache.

use async_trait::async_trait;
use redis::AsyncCommands;
use rolegate_application::{RolePermissionCache, RolePermissionCacheKey};
use rolegate_core::{AppError, AppResult};

/// Redis implementation of the role permission cache port.
#[derive(Clone)]
pub struct RedisRolePermissionCache {
    client: redis::Client,
    key_prefix: String,
}

impl RedisRolePermissionCache {
    /// Creates a cache adapter with a configured Redis client and key prefix.
    #[must_use]
    pub fn new(client: redis::Client, key_prefix: impl Into<String>) -> Self {
        Self {
            client,
            key_prefix: key_prefix.into(),
        }
    }

    fn key_for(&self, key: RolePermissionCacheKey) -> String {
        format!("{}:{}", self.key_prefix, key.storage_key())
    }

    async fn connection(&self) -> AppResult<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|error| AppError::Internal(format!("failed to connect to redis: {error}")))
    }
}

#[async_trait]
impl RolePermissionCache for RedisRolePermissionCache {
    async fn get_role_permission(&self, key: RolePermissionCacheKey) -> AppResult<Option<bool>> {
        let mut connection = self.connection().await?;

        let encoded: Option<String> = connection.get(self.key_for(key)).await.map_err(|error| {
            AppError::Internal(format!("failed to read role permission cache entry: {error}"))
        })?;

        encoded.as_deref().map(decode_answer).transpose()
    }

    async fn set_role_permission(
        &self,
        key: RolePermissionCacheKey,
        allowed: bool,
        ttl_seconds: u32,
    ) -> AppResult<()> {
        if ttl_seconds == 0 {
            return Ok(());
        }

        let mut connection = self.connection().await?;

        connection
            .set_ex(self.key_for(key), encode_answer(allowed), u64::from(ttl_seconds))
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to write role permission cache entry: {error}"
                ))
            })
    }

    async fn remove_role_permissions(&self, keys: &[RolePermissionCacheKey]) -> AppResult<()> {
        if keys.is_empty() {
            return Ok(());
        }

        let redis_keys: Vec<String> = keys.iter().map(|key| self.key_for(*key)).collect();
        let mut connection = self.connection().await?;

        connection.del(redis_keys).await.map_err(|error| {
            AppError::Internal(format!(
                "failed to delete role permission cache entries: {error}"
            ))
        })
    }
}

fn encode_answer(allowed: bool) -> &'static str {
    if allowed { "1" } else { "0" }
}

fn decode_answer(value: &str) -> AppResult<bool> {
    match value {
        "1" => Ok(true),
        "0" => Ok(false),
        _ => Err(AppError::Internal(format!(
            "invalid role permission cache value '{value}'"
        ))),
    }
}

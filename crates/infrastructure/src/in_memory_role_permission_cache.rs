use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rolegate_application::{RolePermissionCache, RolePermissionCacheKey};
use rolegate_core::AppResult;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy)]
struct RolePermissionCacheEntry {
    allowed: bool,
    expires_at: Instant,
}

/// In-memory cache adapter for role permission answers.
#[derive(Default)]
pub struct InMemoryRolePermissionCache {
    entries: RwLock<HashMap<RolePermissionCacheKey, RolePermissionCacheEntry>>,
}

impl InMemoryRolePermissionCache {
    /// Creates an empty in-memory role cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RolePermissionCache for InMemoryRolePermissionCache {
    async fn get_role_permission(&self, key: RolePermissionCacheKey) -> AppResult<Option<bool>> {
        {
            let entries = self.entries.read().await;
            match entries.get(&key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.allowed));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(&key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(&key);
        }

        Ok(None)
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

        let now = Instant::now();
        let expires_at = now
            .checked_add(Duration::from_secs(u64::from(ttl_seconds)))
            .unwrap_or(now);

        self.entries
            .write()
            .await
            .insert(key, RolePermissionCacheEntry { allowed, expires_at });

        Ok(())
    }

    async fn remove_role_permissions(&self, keys: &[RolePermissionCacheKey]) -> AppResult<()> {
        let mut entries = self.entries.write().await;
        for key in keys {
            entries.remove(key);
        }

        Ok(())
    }
}

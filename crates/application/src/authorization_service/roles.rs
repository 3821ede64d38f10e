use rolegate_core::{AppResult, UserIdentity};
use rolegate_domain::{PermissionAction, RulesetName};
use tracing::warn;

use crate::RolePermissionCacheKey;

use super::AuthorizationService;

impl AuthorizationService {
    /// Returns whether any of the user's groups grants an action through a ruleset.
    ///
    /// Answers are cached per user, ruleset and action when a cache is
    /// configured. Cache failures fall back to the repository.
    pub async fn has_role_permission(
        &self,
        user: Option<&UserIdentity>,
        ruleset: RulesetName,
        action: PermissionAction,
    ) -> AppResult<bool> {
        let Some(user) = user else {
            return Ok(false);
        };

        if user.is_superuser() {
            return Ok(true);
        }

        let key = RolePermissionCacheKey::new(user.user_id(), ruleset, action);

        if self.role_cache_ttl_seconds > 0
            && let Some(cache) = &self.role_cache
        {
            match cache.get_role_permission(key).await {
                Ok(Some(allowed)) => return Ok(allowed),
                Ok(None) => {}
                Err(error) => {
                    warn!(cache_key = %key.storage_key(), error = %error, "role cache read failed");
                }
            }
        }

        let allowed = self.compute_role_permission(user, ruleset, action).await?;

        if self.role_cache_ttl_seconds > 0
            && let Some(cache) = &self.role_cache
            && let Err(error) = cache
                .set_role_permission(key, allowed, self.role_cache_ttl_seconds)
                .await
        {
            warn!(cache_key = %key.storage_key(), error = %error, "role cache write failed");
        }

        Ok(allowed)
    }

    async fn compute_role_permission(
        &self,
        user: &UserIdentity,
        ruleset: RulesetName,
        action: PermissionAction,
    ) -> AppResult<bool> {
        let group_ids = self.identity.list_groups_for_user(user.user_id()).await?;
        if group_ids.is_empty() {
            return Ok(false);
        }

        let grants = self
            .permissions
            .list_grants_for_groups(&group_ids, ruleset)
            .await?;

        Ok(grants.iter().any(|grant| grant.allows(action)))
    }
}

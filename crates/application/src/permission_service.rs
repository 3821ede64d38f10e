use std::sync::Arc;

use rolegate_core::{AppResult, GroupId};
use rolegate_domain::{PermissionGrant, RuleFlags, RulesetName};
use tracing::{debug, warn};

use crate::{
    GroupPermissionReconciler, IdentityRepository, PermissionRepository, RolePermissionCache,
    RolePermissionCacheKey,
};

/// Application service storing ruleset grants per group.
#[derive(Clone)]
pub struct PermissionService {
    repository: Arc<dyn PermissionRepository>,
    identity: Arc<dyn IdentityRepository>,
    reconciler: GroupPermissionReconciler,
    role_cache: Option<Arc<dyn RolePermissionCache>>,
}

impl PermissionService {
    /// Creates a permission service sharing the reconciler's group locks.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PermissionRepository>,
        identity: Arc<dyn IdentityRepository>,
        reconciler: GroupPermissionReconciler,
    ) -> Self {
        Self {
            repository,
            identity,
            reconciler,
            role_cache: None,
        }
    }

    /// Invalidates cached role answers of group members after each write.
    #[must_use]
    pub fn with_role_cache(mut self, cache: Arc<dyn RolePermissionCache>) -> Self {
        self.role_cache = Some(cache);
        self
    }

    /// Stores the flags of a ruleset for a group and reconciles the group.
    ///
    /// The grant row and the resulting permission diff commit together.
    pub async fn set_flags(
        &self,
        group_id: GroupId,
        ruleset: RulesetName,
        flags: RuleFlags,
    ) -> AppResult<PermissionGrant> {
        let grant = PermissionGrant::new(group_id, ruleset, flags);
        let report = self.reconciler.sync_group(group_id, Some(&grant)).await?;

        debug!(
            grant = %grant.describe(),
            added = report.added.len(),
            removed = report.removed.len(),
            "stored ruleset grant"
        );

        self.invalidate_members(group_id, ruleset).await;

        Ok(grant)
    }

    /// Returns the stored flags, or no access when the row does not exist yet.
    pub async fn get_flags(&self, group_id: GroupId, ruleset: RulesetName) -> AppResult<RuleFlags> {
        Ok(self
            .repository
            .find_grant(group_id, ruleset)
            .await?
            .map(|grant| grant.flags())
            .unwrap_or_default())
    }

    /// Lists one grant per ruleset in declaration order, filling defaults.
    pub async fn list_grants(&self, group_id: GroupId) -> AppResult<Vec<PermissionGrant>> {
        let stored = self.repository.list_grants_for_group(group_id).await?;

        Ok(RulesetName::all()
            .iter()
            .map(|ruleset| {
                stored
                    .iter()
                    .find(|grant| grant.ruleset() == *ruleset)
                    .cloned()
                    .unwrap_or_else(|| PermissionGrant::empty(group_id, *ruleset))
            })
            .collect())
    }

    async fn invalidate_members(&self, group_id: GroupId, ruleset: RulesetName) {
        let Some(cache) = &self.role_cache else {
            return;
        };

        let members = match self.identity.list_users_in_group(group_id).await {
            Ok(members) => members,
            Err(error) => {
                warn!(group_id = %group_id, error = %error, "failed to list group members for cache invalidation");
                return;
            }
        };

        let keys = RolePermissionCacheKey::all_for(&members, &[ruleset]);
        if let Err(error) = cache.remove_role_permissions(&keys).await {
            warn!(group_id = %group_id, error = %error, "failed to invalidate role permission cache");
        }
    }
}

use std::sync::Arc;

use rolegate_core::{AppResult, GroupId, UserId};
use rolegate_domain::{OwnerSubject, RulesetName};
use tracing::{info, warn};

use crate::{
    GroupPermissionReconciler, OwnerService, ReconciliationReport, RolePermissionCache,
    RolePermissionCacheKey, UserProfileService,
};

/// Whether subject changes come from interactive use or a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LifecycleMode {
    /// Regular operation.
    #[default]
    Interactive,
    /// Fixture or data import; owner records are not created.
    Import,
}

/// Keeps owners, profiles, grants and cached answers consistent with
/// user and group changes made by the identity collaborator.
#[derive(Clone)]
pub struct SubjectLifecycleService {
    owners: OwnerService,
    profiles: UserProfileService,
    reconciler: GroupPermissionReconciler,
    role_cache: Option<Arc<dyn RolePermissionCache>>,
}

impl SubjectLifecycleService {
    /// Creates a lifecycle service.
    #[must_use]
    pub fn new(
        owners: OwnerService,
        profiles: UserProfileService,
        reconciler: GroupPermissionReconciler,
    ) -> Self {
        Self {
            owners,
            profiles,
            reconciler,
            role_cache: None,
        }
    }

    /// Invalidates cached role answers on membership and group changes.
    #[must_use]
    pub fn with_role_cache(mut self, cache: Arc<dyn RolePermissionCache>) -> Self {
        self.role_cache = Some(cache);
        self
    }

    /// Handles a newly created user.
    pub async fn user_created(&self, user_id: UserId, mode: LifecycleMode) -> AppResult<()> {
        self.profiles.ensure_profile(user_id).await?;

        if mode != LifecycleMode::Import {
            self.owners.create(OwnerSubject::User(user_id)).await?;
        }

        Ok(())
    }

    /// Handles a newly created group, materializing its default grants.
    pub async fn group_created(
        &self,
        group_id: GroupId,
        mode: LifecycleMode,
    ) -> AppResult<ReconciliationReport> {
        if mode != LifecycleMode::Import {
            self.owners.create(OwnerSubject::Group(group_id)).await?;
        }

        self.reconciler.reconcile(group_id).await
    }

    /// Handles a deleted user.
    pub async fn user_deleted(&self, user_id: UserId) -> AppResult<()> {
        self.owners.delete(OwnerSubject::User(user_id)).await?;
        self.profiles.delete_profile(user_id).await
    }

    /// Handles a deleted group. `former_members` are the users that
    /// belonged to it at deletion time.
    pub async fn group_deleted(&self, group_id: GroupId, former_members: &[UserId]) -> AppResult<()> {
        self.owners.delete(OwnerSubject::Group(group_id)).await?;
        self.reconciler.delete_group(group_id).await?;

        let cleared = self.profiles.clear_primary_group(group_id).await?;
        if !cleared.is_empty() {
            info!(group_id = %group_id, profiles = cleared.len(), "cleared primary group of deleted group");
        }

        self.invalidate(former_members).await;
        Ok(())
    }

    /// Handles a user joining or leaving groups.
    pub async fn membership_changed(&self, user_id: UserId) -> AppResult<()> {
        self.profiles.validate_primary_group(user_id).await?;
        self.invalidate(&[user_id]).await;
        Ok(())
    }

    async fn invalidate(&self, user_ids: &[UserId]) {
        let Some(cache) = &self.role_cache else {
            return;
        };

        let keys = RolePermissionCacheKey::all_for(user_ids, RulesetName::all());
        if let Err(error) = cache.remove_role_permissions(&keys).await {
            warn!(users = user_ids.len(), error = %error, "failed to invalidate role permission cache");
        }
    }
}

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use rolegate_application::{
    GroupPermissionTransaction, PermissionRepository, PermissionWriteOutcome,
};
use rolegate_core::{AppResult, GroupId};
use rolegate_domain::{ModelPermission, PermissionGrant, RuleTable, RulesetName};
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Clone, Default)]
struct PermissionState {
    grants: HashMap<(GroupId, RulesetName), PermissionGrant>,
    permissions: HashMap<GroupId, BTreeSet<ModelPermission>>,
}

/// In-memory grants and materialized group permissions.
///
/// Only permissions present in the catalog can be granted; anything else is
/// reported as unresolved, like a missing permission object in a database.
pub struct InMemoryPermissionRepository {
    state: Arc<Mutex<PermissionState>>,
    catalog: Arc<BTreeSet<ModelPermission>>,
}

impl InMemoryPermissionRepository {
    /// Creates a repository whose catalog is the standard rule table universe.
    #[must_use]
    pub fn new() -> Self {
        Self::with_catalog(RuleTable::standard().permission_universe())
    }

    /// Creates a repository with an explicit permission catalog.
    #[must_use]
    pub fn with_catalog(catalog: BTreeSet<ModelPermission>) -> Self {
        Self {
            state: Arc::new(Mutex::new(PermissionState::default())),
            catalog: Arc::new(catalog),
        }
    }

    /// Returns the materialized permissions of one group.
    pub async fn group_permissions(&self, group_id: GroupId) -> BTreeSet<ModelPermission> {
        self.state
            .lock()
            .await
            .permissions
            .get(&group_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryPermissionRepository {
    fn default() -> Self {
        Self::new()
    }
}

struct InMemoryGroupPermissionTransaction {
    group_id: GroupId,
    guard: OwnedMutexGuard<PermissionState>,
    staged: PermissionState,
    catalog: Arc<BTreeSet<ModelPermission>>,
}

#[async_trait]
impl GroupPermissionTransaction for InMemoryGroupPermissionTransaction {
    async fn load_grants(&mut self) -> AppResult<Vec<PermissionGrant>> {
        Ok(RulesetName::all()
            .iter()
            .filter_map(|ruleset| self.staged.grants.get(&(self.group_id, *ruleset)).cloned())
            .collect())
    }

    async fn load_permissions(&mut self) -> AppResult<BTreeSet<ModelPermission>> {
        Ok(self
            .staged
            .permissions
            .get(&self.group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn save_grant(&mut self, grant: &PermissionGrant) -> AppResult<()> {
        self.staged
            .grants
            .insert((grant.group_id(), grant.ruleset()), grant.clone());
        Ok(())
    }

    async fn add_permission(
        &mut self,
        permission: &ModelPermission,
    ) -> AppResult<PermissionWriteOutcome> {
        if !self.catalog.contains(permission) {
            return Ok(PermissionWriteOutcome::Unresolved);
        }

        self.staged
            .permissions
            .entry(self.group_id)
            .or_default()
            .insert(permission.clone());
        Ok(PermissionWriteOutcome::Applied)
    }

    async fn remove_permission(
        &mut self,
        permission: &ModelPermission,
    ) -> AppResult<PermissionWriteOutcome> {
        if !self.catalog.contains(permission) {
            return Ok(PermissionWriteOutcome::Unresolved);
        }

        if let Some(permissions) = self.staged.permissions.get_mut(&self.group_id) {
            permissions.remove(permission);
        }
        Ok(PermissionWriteOutcome::Applied)
    }

    async fn commit(&mut self) -> AppResult<()> {
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for InMemoryPermissionRepository {
    async fn begin_group_sync(
        &self,
        group_id: GroupId,
    ) -> AppResult<Box<dyn GroupPermissionTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();

        Ok(Box::new(InMemoryGroupPermissionTransaction {
            group_id,
            guard,
            staged,
            catalog: Arc::clone(&self.catalog),
        }))
    }

    async fn find_grant(
        &self,
        group_id: GroupId,
        ruleset: RulesetName,
    ) -> AppResult<Option<PermissionGrant>> {
        Ok(self
            .state
            .lock()
            .await
            .grants
            .get(&(group_id, ruleset))
            .cloned())
    }

    async fn list_grants_for_group(&self, group_id: GroupId) -> AppResult<Vec<PermissionGrant>> {
        let state = self.state.lock().await;
        Ok(RulesetName::all()
            .iter()
            .filter_map(|ruleset| state.grants.get(&(group_id, *ruleset)).cloned())
            .collect())
    }

    async fn list_grants_for_groups(
        &self,
        group_ids: &[GroupId],
        ruleset: RulesetName,
    ) -> AppResult<Vec<PermissionGrant>> {
        let state = self.state.lock().await;
        Ok(group_ids
            .iter()
            .filter_map(|group_id| state.grants.get(&(*group_id, ruleset)).cloned())
            .collect())
    }

    async fn list_permissions_for_groups(
        &self,
        group_ids: &[GroupId],
    ) -> AppResult<BTreeSet<ModelPermission>> {
        let state = self.state.lock().await;
        Ok(group_ids
            .iter()
            .filter_map(|group_id| state.permissions.get(group_id))
            .flatten()
            .cloned()
            .collect())
    }

    async fn delete_group_permissions(&self, group_id: GroupId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .grants
            .retain(|(grant_group_id, _), _| *grant_group_id != group_id);
        state.permissions.remove(&group_id);
        Ok(())
    }
}

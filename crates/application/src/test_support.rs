use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use rolegate_core::{AppError, AppResult, GroupId, UserId};
use rolegate_domain::{
    ModelPermission, Owner, OwnerSubject, PermissionGrant, RulesetName, UserProfile,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    GroupPermissionTransaction, IdentityRepository, OwnerRepository, PermissionRepository,
    PermissionWriteOutcome, RolePermissionCache, RolePermissionCacheKey, UserProfileRepository,
};

#[derive(Default)]
pub(crate) struct FakeIdentityRepository {
    groups: Mutex<BTreeMap<GroupId, Vec<UserId>>>,
    usernames: Mutex<HashMap<UserId, String>>,
    group_names: Mutex<HashMap<GroupId, String>>,
}

impl FakeIdentityRepository {
    pub(crate) async fn name_user(&self, user_id: UserId, username: &str) {
        self.usernames.lock().await.insert(user_id, username.to_owned());
    }

    pub(crate) async fn name_group(&self, group_id: GroupId, name: &str) {
        self.group_names.lock().await.insert(group_id, name.to_owned());
    }

    pub(crate) async fn add_group(&self, group_id: GroupId, members: &[UserId]) {
        self.groups.lock().await.insert(group_id, members.to_vec());
    }

    pub(crate) async fn remove_group(&self, group_id: GroupId) {
        self.groups.lock().await.remove(&group_id);
    }

    pub(crate) async fn remove_member(&self, group_id: GroupId, user_id: UserId) {
        if let Some(members) = self.groups.lock().await.get_mut(&group_id) {
            members.retain(|member| *member != user_id);
        }
    }
}

#[async_trait]
impl IdentityRepository for FakeIdentityRepository {
    async fn group_exists(&self, group_id: GroupId) -> AppResult<bool> {
        Ok(self.groups.lock().await.contains_key(&group_id))
    }

    async fn list_group_ids(&self) -> AppResult<Vec<GroupId>> {
        Ok(self.groups.lock().await.keys().copied().collect())
    }

    async fn list_groups_for_user(&self, user_id: UserId) -> AppResult<Vec<GroupId>> {
        Ok(self
            .groups
            .lock()
            .await
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .map(|(group_id, _)| *group_id)
            .collect())
    }

    async fn list_users_in_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        Ok(self
            .groups
            .lock()
            .await
            .get(&group_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_username(&self, user_id: UserId) -> AppResult<Option<String>> {
        Ok(self.usernames.lock().await.get(&user_id).cloned())
    }

    async fn find_group_name(&self, group_id: GroupId) -> AppResult<Option<String>> {
        Ok(self.group_names.lock().await.get(&group_id).cloned())
    }
}

#[derive(Default, Clone)]
pub(crate) struct FakePermissionState {
    pub(crate) grants: HashMap<(GroupId, RulesetName), PermissionGrant>,
    pub(crate) permissions: HashMap<GroupId, BTreeSet<ModelPermission>>,
    pub(crate) writes: usize,
}

#[derive(Default)]
pub(crate) struct FakePermissionRepository {
    state: Arc<Mutex<FakePermissionState>>,
    unresolvable: BTreeSet<ModelPermission>,
    failing_groups: BTreeSet<GroupId>,
}

impl FakePermissionRepository {
    pub(crate) fn with_unresolvable(unresolvable: BTreeSet<ModelPermission>) -> Self {
        Self {
            unresolvable,
            ..Self::default()
        }
    }

    pub(crate) fn with_failing_group(group_id: GroupId) -> Self {
        Self {
            failing_groups: BTreeSet::from([group_id]),
            ..Self::default()
        }
    }

    pub(crate) async fn snapshot(&self) -> FakePermissionState {
        self.state.lock().await.clone()
    }

    pub(crate) async fn insert_permission(&self, group_id: GroupId, permission: ModelPermission) {
        self.state
            .lock()
            .await
            .permissions
            .entry(group_id)
            .or_default()
            .insert(permission);
    }
}

struct FakeTransaction {
    group_id: GroupId,
    guard: OwnedMutexGuard<FakePermissionState>,
    staged: FakePermissionState,
    unresolvable: BTreeSet<ModelPermission>,
}

#[async_trait]
impl GroupPermissionTransaction for FakeTransaction {
    async fn load_grants(&mut self) -> AppResult<Vec<PermissionGrant>> {
        Ok(self
            .staged
            .grants
            .values()
            .filter(|grant| grant.group_id() == self.group_id)
            .cloned()
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
        if self.unresolvable.contains(permission) {
            return Ok(PermissionWriteOutcome::Unresolved);
        }

        self.staged.writes += 1;
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
        if self.unresolvable.contains(permission) {
            return Ok(PermissionWriteOutcome::Unresolved);
        }

        self.staged.writes += 1;
        if let Some(permissions) = self.staged.permissions.get_mut(&self.group_id) {
            permissions.remove(permission);
        }
        Ok(PermissionWriteOutcome::Applied)
    }

    async fn commit(&mut self) -> AppResult<()> {
        *self.guard = self.staged.clone();
        Ok(())
    }
}

#[async_trait]
impl PermissionRepository for FakePermissionRepository {
    async fn begin_group_sync(
        &self,
        group_id: GroupId,
    ) -> AppResult<Box<dyn GroupPermissionTransaction>> {
        if self.failing_groups.contains(&group_id) {
            return Err(AppError::Internal(format!(
                "failed to lock group '{group_id}'"
            )));
        }

        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(FakeTransaction {
            group_id,
            guard,
            staged,
            unresolvable: self.unresolvable.clone(),
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
        Ok(self
            .state
            .lock()
            .await
            .grants
            .values()
            .filter(|grant| grant.group_id() == group_id)
            .cloned()
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
        state.grants.retain(|(grant_group, _), _| *grant_group != group_id);
        state.permissions.remove(&group_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeRoleCache {
    pub(crate) entries: Mutex<HashMap<RolePermissionCacheKey, bool>>,
    pub(crate) reads: Mutex<usize>,
    pub(crate) failing: bool,
}

impl FakeRoleCache {
    pub(crate) fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    fn check_available(&self) -> AppResult<()> {
        if self.failing {
            return Err(AppError::Internal("role cache unavailable".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl RolePermissionCache for FakeRoleCache {
    async fn get_role_permission(&self, key: RolePermissionCacheKey) -> AppResult<Option<bool>> {
        self.check_available()?;
        *self.reads.lock().await += 1;
        Ok(self.entries.lock().await.get(&key).copied())
    }

    async fn set_role_permission(
        &self,
        key: RolePermissionCacheKey,
        allowed: bool,
        _ttl_seconds: u32,
    ) -> AppResult<()> {
        self.check_available()?;
        self.entries.lock().await.insert(key, allowed);
        Ok(())
    }

    async fn remove_role_permissions(&self, keys: &[RolePermissionCacheKey]) -> AppResult<()> {
        self.check_available()?;
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeOwnerRepository {
    pub(crate) owners: Mutex<Vec<Owner>>,
    pub(crate) race_winner: Mutex<Option<Owner>>,
}

#[async_trait]
impl OwnerRepository for FakeOwnerRepository {
    async fn find_owner(&self, subject: OwnerSubject) -> AppResult<Option<Owner>> {
        Ok(self
            .owners
            .lock()
            .await
            .iter()
            .find(|owner| owner.subject() == subject)
            .copied())
    }

    async fn insert_owner(&self, owner: Owner) -> AppResult<()> {
        let mut owners = self.owners.lock().await;
        if let Some(winner) = self.race_winner.lock().await.take() {
            owners.push(winner);
        }

        if owners
            .iter()
            .any(|existing| existing.subject() == owner.subject())
        {
            return Err(AppError::Conflict(format!(
                "owner for '{}' already exists",
                owner.subject()
            )));
        }

        owners.push(owner);
        Ok(())
    }

    async fn list_owners_for_subjects(&self, subjects: &[OwnerSubject]) -> AppResult<Vec<Owner>> {
        Ok(self
            .owners
            .lock()
            .await
            .iter()
            .filter(|owner| subjects.contains(&owner.subject()))
            .copied()
            .collect())
    }

    async fn delete_owner(&self, subject: OwnerSubject) -> AppResult<bool> {
        let mut owners = self.owners.lock().await;
        let before = owners.len();
        owners.retain(|owner| owner.subject() != subject);
        Ok(owners.len() != before)
    }
}

#[derive(Default)]
pub(crate) struct FakeUserProfileRepository {
    pub(crate) profiles: Mutex<HashMap<UserId, UserProfile>>,
}

#[async_trait]
impl UserProfileRepository for FakeUserProfileRepository {
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.lock().await.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()> {
        self.profiles
            .lock()
            .await
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn clear_primary_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        let mut cleared = Vec::new();
        for profile in self.profiles.lock().await.values_mut() {
            if profile.primary_group == Some(group_id) {
                profile.primary_group = None;
                cleared.push(profile.user_id);
            }
        }
        Ok(cleared)
    }

    async fn delete_profile(&self, user_id: UserId) -> AppResult<()> {
        self.profiles.lock().await.remove(&user_id);
        Ok(())
    }
}

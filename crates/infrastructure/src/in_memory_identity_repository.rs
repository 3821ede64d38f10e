use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use rolegate_application::IdentityRepository;
use rolegate_core::{AppError, AppResult, GroupId, UserId, UserIdentity};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct GroupRecord {
    name: String,
    members: BTreeSet<UserId>,
}

#[derive(Default)]
struct IdentityState {
    users: HashMap<UserId, UserIdentity>,
    groups: BTreeMap<GroupId, GroupRecord>,
}

/// In-memory users, groups and memberships.
#[derive(Default)]
pub struct InMemoryIdentityRepository {
    state: RwLock<IdentityState>,
}

impl InMemoryIdentityRepository {
    /// Creates an empty identity store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a user.
    pub async fn add_user(&self, user: UserIdentity) {
        self.state.write().await.users.insert(user.user_id(), user);
    }

    /// Returns a registered user.
    pub async fn find_user(&self, user_id: UserId) -> Option<UserIdentity> {
        self.state.read().await.users.get(&user_id).cloned()
    }

    /// Removes a user and all of its memberships.
    pub async fn remove_user(&self, user_id: UserId) {
        let mut state = self.state.write().await;
        state.users.remove(&user_id);
        for group in state.groups.values_mut() {
            group.members.remove(&user_id);
        }
    }

    /// Registers a group. Group names are unique.
    pub async fn add_group(&self, group_id: GroupId, name: &str) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state
            .groups
            .iter()
            .any(|(existing_id, group)| *existing_id != group_id && group.name == name)
        {
            return Err(AppError::Conflict(format!("group '{name}' already exists")));
        }

        state.groups.entry(group_id).or_insert_with(|| GroupRecord {
            name: name.to_owned(),
            members: BTreeSet::new(),
        });
        Ok(())
    }

    /// Removes a group and returns its former members.
    pub async fn remove_group(&self, group_id: GroupId) -> Vec<UserId> {
        self.state
            .write()
            .await
            .groups
            .remove(&group_id)
            .map(|group| group.members.into_iter().collect())
            .unwrap_or_default()
    }

    /// Adds a user to a group.
    pub async fn add_member(&self, group_id: GroupId, user_id: UserId) -> AppResult<()> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user_id) {
            return Err(AppError::NotFound(format!("user '{user_id}' does not exist")));
        }

        let group = state
            .groups
            .get_mut(&group_id)
            .ok_or_else(|| AppError::NotFound(format!("group '{group_id}' does not exist")))?;
        group.members.insert(user_id);
        Ok(())
    }

    /// Removes a user from a group.
    pub async fn remove_member(&self, group_id: GroupId, user_id: UserId) {
        if let Some(group) = self.state.write().await.groups.get_mut(&group_id) {
            group.members.remove(&user_id);
        }
    }
}

#[async_trait]
impl IdentityRepository for InMemoryIdentityRepository {
    async fn group_exists(&self, group_id: GroupId) -> AppResult<bool> {
        Ok(self.state.read().await.groups.contains_key(&group_id))
    }

    async fn list_group_ids(&self) -> AppResult<Vec<GroupId>> {
        Ok(self.state.read().await.groups.keys().copied().collect())
    }

    async fn list_groups_for_user(&self, user_id: UserId) -> AppResult<Vec<GroupId>> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .iter()
            .filter(|(_, group)| group.members.contains(&user_id))
            .map(|(group_id, _)| *group_id)
            .collect())
    }

    async fn list_users_in_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .get(&group_id)
            .map(|group| group.members.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn find_username(&self, user_id: UserId) -> AppResult<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .get(&user_id)
            .map(|user| user.username().to_owned()))
    }

    async fn find_group_name(&self, group_id: GroupId) -> AppResult<Option<String>> {
        Ok(self
            .state
            .read()
            .await
            .groups
            .get(&group_id)
            .map(|group| group.name.clone()))
    }
}

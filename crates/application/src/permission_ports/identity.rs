use async_trait::async_trait;
use rolegate_core::{AppResult, GroupId, UserId};

/// Port to the identity collaborator owning users, groups and memberships.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Returns whether the group exists.
    async fn group_exists(&self, group_id: GroupId) -> AppResult<bool>;

    /// Lists every group identifier.
    async fn list_group_ids(&self) -> AppResult<Vec<GroupId>>;

    /// Lists the groups a user currently belongs to.
    async fn list_groups_for_user(&self, user_id: UserId) -> AppResult<Vec<GroupId>>;

    /// Lists the current members of a group.
    async fn list_users_in_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>>;

    /// Returns the username of a user.
    async fn find_username(&self, user_id: UserId) -> AppResult<Option<String>>;

    /// Returns the name of a group.
    async fn find_group_name(&self, group_id: GroupId) -> AppResult<Option<String>>;
}

use async_trait::async_trait;
use rolegate_core::{AppResult, GroupId, UserId};
use rolegate_domain::{UserProfile, UserType};
use serde_json::Value;

/// Partial update of a user profile. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateUserProfileInput {
    /// New display name.
    pub display_name: Option<String>,
    /// New position.
    pub position: Option<String>,
    /// New language code.
    pub language: Option<String>,
    /// New status message.
    pub status: Option<String>,
    /// New location.
    pub location: Option<String>,
    /// New contact information.
    pub contact: Option<String>,
    /// New organisation.
    pub organisation: Option<String>,
    /// New activity flag.
    pub active: Option<bool>,
    /// New account classification.
    pub user_type: Option<UserType>,
    /// New primary group; `Some(None)` clears it.
    pub primary_group: Option<Option<GroupId>>,
    /// New theme settings.
    pub theme: Option<Value>,
    /// New widget settings.
    pub widgets: Option<Value>,
}

/// Repository port for user profiles.
#[async_trait]
pub trait UserProfileRepository: Send + Sync {
    /// Finds the profile of a user.
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<UserProfile>>;

    /// Inserts or replaces a profile.
    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()>;

    /// Clears the primary group of every profile pointing at the group.
    /// Returns the affected users.
    async fn clear_primary_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>>;

    /// Deletes the profile of a user.
    async fn delete_profile(&self, user_id: UserId) -> AppResult<()>;
}

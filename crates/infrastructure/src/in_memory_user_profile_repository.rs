use std::collections::HashMap;

use async_trait::async_trait;
use rolegate_application::UserProfileRepository;
use rolegate_core::{AppResult, GroupId, UserId};
use rolegate_domain::UserProfile;
use tokio::sync::RwLock;

/// In-memory user profiles.
#[derive(Default)]
pub struct InMemoryUserProfileRepository {
    profiles: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryUserProfileRepository {
    /// Creates an empty profile store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserProfileRepository for InMemoryUserProfileRepository {
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        Ok(self.profiles.read().await.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()> {
        self.profiles
            .write()
            .await
            .insert(profile.user_id, profile.clone());
        Ok(())
    }

    async fn clear_primary_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        let mut cleared = Vec::new();
        for profile in self.profiles.write().await.values_mut() {
            if profile.primary_group == Some(group_id) {
                profile.primary_group = None;
                cleared.push(profile.user_id);
            }
        }

        Ok(cleared)
    }

    async fn delete_profile(&self, user_id: UserId) -> AppResult<()> {
        self.profiles.write().await.remove(&user_id);
        Ok(())
    }
}

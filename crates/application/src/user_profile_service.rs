use std::sync::Arc;

use rolegate_core::{AppError, AppResult, GroupId, UserId};
use rolegate_domain::UserProfile;
use tracing::info;

use crate::{IdentityRepository, UpdateUserProfileInput, UserProfileRepository};

/// Application service for informational user profiles.
#[derive(Clone)]
pub struct UserProfileService {
    profiles: Arc<dyn UserProfileRepository>,
    identity: Arc<dyn IdentityRepository>,
}

impl UserProfileService {
    /// Creates a profile service.
    #[must_use]
    pub fn new(
        profiles: Arc<dyn UserProfileRepository>,
        identity: Arc<dyn IdentityRepository>,
    ) -> Self {
        Self { profiles, identity }
    }

    /// Returns the user's profile, creating the default one when missing.
    pub async fn ensure_profile(&self, user_id: UserId) -> AppResult<UserProfile> {
        if let Some(profile) = self.profiles.find_profile(user_id).await? {
            return Ok(profile);
        }

        let profile = UserProfile::new(user_id);
        self.profiles.save_profile(&profile).await?;
        Ok(profile)
    }

    /// Applies a partial update.
    ///
    /// A new primary group must be one of the user's groups.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        input: UpdateUserProfileInput,
    ) -> AppResult<UserProfile> {
        let mut profile = self.ensure_profile(user_id).await?;

        if let Some(Some(group_id)) = input.primary_group {
            let memberships = self.identity.list_groups_for_user(user_id).await?;
            if !memberships.contains(&group_id) {
                return Err(AppError::Validation(format!(
                    "user '{user_id}' is not a member of group '{group_id}'"
                )));
            }
        }

        apply_update(&mut profile, input);
        self.profiles.save_profile(&profile).await?;
        Ok(profile)
    }

    /// Clears the user's primary group when the user left that group.
    ///
    /// Returns whether the profile changed.
    pub async fn validate_primary_group(&self, user_id: UserId) -> AppResult<bool> {
        let Some(mut profile) = self.profiles.find_profile(user_id).await? else {
            return Ok(false);
        };

        let memberships = self.identity.list_groups_for_user(user_id).await?;
        if !profile.retain_valid_primary_group(&memberships) {
            return Ok(false);
        }

        self.profiles.save_profile(&profile).await?;
        info!(user_id = %user_id, "cleared primary group after membership change");
        Ok(true)
    }

    /// Clears every primary group pointing at a deleted group.
    pub async fn clear_primary_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        self.profiles.clear_primary_group(group_id).await
    }

    /// Removes the profile of a deleted user.
    pub async fn delete_profile(&self, user_id: UserId) -> AppResult<()> {
        self.profiles.delete_profile(user_id).await
    }
}

fn apply_update(profile: &mut UserProfile, input: UpdateUserProfileInput) {
    let UpdateUserProfileInput {
        display_name,
        position,
        language,
        status,
        location,
        contact,
        organisation,
        active,
        user_type,
        primary_group,
        theme,
        widgets,
    } = input;

    if display_name.is_some() {
        profile.display_name = display_name;
    }
    if position.is_some() {
        profile.position = position;
    }
    if language.is_some() {
        profile.language = language;
    }
    if status.is_some() {
        profile.status = status;
    }
    if location.is_some() {
        profile.location = location;
    }
    if contact.is_some() {
        profile.contact = contact;
    }
    if organisation.is_some() {
        profile.organisation = organisation;
    }
    if let Some(active) = active {
        profile.active = active;
    }
    if let Some(user_type) = user_type {
        profile.user_type = user_type;
    }
    if let Some(primary_group) = primary_group {
        profile.primary_group = primary_group;
    }
    if theme.is_some() {
        profile.theme = theme;
    }
    if widgets.is_some() {
        profile.widgets = widgets;
    }
}

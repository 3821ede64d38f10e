use std::sync::Arc;

use rolegate_core::{AppError, AppResult, UserId, UserIdentity};
use rolegate_domain::{Owner, OwnerId, OwnerSubject};
use tracing::debug;

use crate::{IdentityRepository, OwnerRepository};

/// Application service for the owner registry.
#[derive(Clone)]
pub struct OwnerService {
    owners: Arc<dyn OwnerRepository>,
    identity: Arc<dyn IdentityRepository>,
}

impl OwnerService {
    /// Creates an owner service.
    #[must_use]
    pub fn new(owners: Arc<dyn OwnerRepository>, identity: Arc<dyn IdentityRepository>) -> Self {
        Self { owners, identity }
    }

    /// Returns the owner of a subject, creating it when missing.
    pub async fn create(&self, subject: OwnerSubject) -> AppResult<Owner> {
        if let Some(owner) = self.owners.find_owner(subject).await? {
            return Ok(owner);
        }

        let owner = Owner::new(OwnerId::new(), subject);
        match self.owners.insert_owner(owner).await {
            Ok(()) => {
                debug!(owner_id = %owner.owner_id(), subject = %subject, "created owner");
                Ok(owner)
            }
            Err(AppError::Conflict(_)) => {
                self.owners.find_owner(subject).await?.ok_or_else(|| {
                    AppError::Internal(format!(
                        "owner for '{subject}' conflicted but could not be read back"
                    ))
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Returns the owner of a subject.
    pub async fn resolve(&self, subject: OwnerSubject) -> AppResult<Option<Owner>> {
        self.owners.find_owner(subject).await
    }

    /// Returns the display name of an owner: the username or the group name.
    pub async fn owner_name(&self, owner: &Owner) -> AppResult<String> {
        let name = match owner.subject() {
            OwnerSubject::User(user_id) => self.identity.find_username(user_id).await?,
            OwnerSubject::Group(group_id) => self.identity.find_group_name(group_id).await?,
        };

        name.ok_or_else(|| {
            AppError::NotFound(format!("{} '{}' does not exist", owner.label(), owner.subject()))
        })
    }

    /// Returns the owners an owner stands for.
    ///
    /// A group owner expands to the owners of its current members, followed
    /// by the group owner itself when `include_group` is set. A user owner
    /// stands only for itself.
    pub async fn related_owners(&self, owner: &Owner, include_group: bool) -> AppResult<Vec<Owner>> {
        let OwnerSubject::Group(group_id) = owner.subject() else {
            return Ok(vec![*owner]);
        };

        let members = self.identity.list_users_in_group(group_id).await?;
        let subjects: Vec<OwnerSubject> = members.into_iter().map(OwnerSubject::User).collect();
        let mut related = self.owners.list_owners_for_subjects(&subjects).await?;

        if include_group {
            related.push(*owner);
        }

        Ok(related)
    }

    /// Returns whether the candidate user is covered by an owner.
    pub async fn is_authorized_subject(
        &self,
        owner: &Owner,
        candidate: Option<&UserIdentity>,
        include_group: bool,
    ) -> AppResult<bool> {
        let Some(candidate) = candidate else {
            return Ok(false);
        };

        let Some(candidate_owner) = self
            .owners
            .find_owner(OwnerSubject::User(candidate.user_id()))
            .await?
        else {
            return Ok(false);
        };

        Ok(self
            .related_owners(owner, include_group)
            .await?
            .iter()
            .any(|related| related.owner_id() == candidate_owner.owner_id()))
    }

    /// Returns the user's own owner and the owners of the user's groups.
    pub async fn owners_matching_user(&self, user_id: UserId) -> AppResult<Vec<Owner>> {
        let mut subjects = vec![OwnerSubject::User(user_id)];
        subjects.extend(
            self.identity
                .list_groups_for_user(user_id)
                .await?
                .into_iter()
                .map(OwnerSubject::Group),
        );

        self.owners.list_owners_for_subjects(&subjects).await
    }

    /// Removes the owner of a deleted subject.
    pub async fn delete(&self, subject: OwnerSubject) -> AppResult<()> {
        if self.owners.delete_owner(subject).await? {
            debug!(subject = %subject, "deleted owner");
        }

        Ok(())
    }
}

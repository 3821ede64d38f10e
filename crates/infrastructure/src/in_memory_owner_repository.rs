use std::collections::HashMap;

use async_trait::async_trait;
use rolegate_application::OwnerRepository;
use rolegate_core::{AppError, AppResult};
use rolegate_domain::{Owner, OwnerSubject};
use tokio::sync::RwLock;

/// In-memory owner registry keyed by subject.
#[derive(Default)]
pub struct InMemoryOwnerRepository {
    owners: RwLock<HashMap<OwnerSubject, Owner>>,
}

impl InMemoryOwnerRepository {
    /// Creates an empty owner registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OwnerRepository for InMemoryOwnerRepository {
    async fn find_owner(&self, subject: OwnerSubject) -> AppResult<Option<Owner>> {
        Ok(self.owners.read().await.get(&subject).copied())
    }

    async fn insert_owner(&self, owner: Owner) -> AppResult<()> {
        let mut owners = self.owners.write().await;
        if owners.contains_key(&owner.subject()) {
            return Err(AppError::Conflict(format!(
                "owner for '{}' already exists",
                owner.subject()
            )));
        }

        owners.insert(owner.subject(), owner);
        Ok(())
    }

    async fn list_owners_for_subjects(&self, subjects: &[OwnerSubject]) -> AppResult<Vec<Owner>> {
        let owners = self.owners.read().await;
        Ok(subjects
            .iter()
            .filter_map(|subject| owners.get(subject).copied())
            .collect())
    }

    async fn delete_owner(&self, subject: OwnerSubject) -> AppResult<bool> {
        Ok(self.owners.write().await.remove(&subject).is_some())
    }
}

use async_trait::async_trait;
use rolegate_core::AppResult;
use rolegate_domain::{Owner, OwnerSubject};

/// Repository port for owner records.
#[async_trait]
pub trait OwnerRepository: Send + Sync {
    /// Finds the owner record of a subject.
    async fn find_owner(&self, subject: OwnerSubject) -> AppResult<Option<Owner>>;

    /// Inserts an owner record.
    ///
    /// Returns `AppError::Conflict` when the subject already has an owner.
    async fn insert_owner(&self, owner: Owner) -> AppResult<()>;

    /// Lists the owner records of several subjects, skipping subjects without one.
    async fn list_owners_for_subjects(&self, subjects: &[OwnerSubject]) -> AppResult<Vec<Owner>>;

    /// Deletes the owner record of a subject. Returns whether a record existed.
    async fn delete_owner(&self, subject: OwnerSubject) -> AppResult<bool>;
}

use std::collections::BTreeSet;

use async_trait::async_trait;
use rolegate_core::{AppResult, GroupId};
use rolegate_domain::{ModelPermission, PermissionGrant, RulesetName};

/// Result of writing one permission to the authorization substrate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionWriteOutcome {
    /// The permission object exists and the write was staged.
    Applied,
    /// The substrate has no permission object for this table/action pair.
    Unresolved,
}

/// Summary of one group reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Reconciled group.
    pub group_id: GroupId,
    /// Permissions granted by this pass.
    pub added: Vec<ModelPermission>,
    /// Permissions revoked by this pass.
    pub removed: Vec<ModelPermission>,
    /// Permissions skipped because the substrate could not resolve them.
    pub unresolved: Vec<ModelPermission>,
}

impl ReconciliationReport {
    /// Returns whether the pass mutated the substrate.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }
}

/// Transaction scoped to one group's grants and materialized permissions.
///
/// Implementations hold an exclusive lock on the group until the
/// transaction is committed or dropped. Dropping without commit discards
/// every staged write.
#[async_trait]
pub trait GroupPermissionTransaction: Send {
    /// Loads every stored grant row of the group.
    async fn load_grants(&mut self) -> AppResult<Vec<PermissionGrant>>;

    /// Loads the group's materialized permission set.
    async fn load_permissions(&mut self) -> AppResult<BTreeSet<ModelPermission>>;

    /// Inserts or replaces one grant row.
    async fn save_grant(&mut self, grant: &PermissionGrant) -> AppResult<()>;

    /// Grants one permission to the group.
    async fn add_permission(
        &mut self,
        permission: &ModelPermission,
    ) -> AppResult<PermissionWriteOutcome>;

    /// Revokes one permission from the group.
    async fn remove_permission(
        &mut self,
        permission: &ModelPermission,
    ) -> AppResult<PermissionWriteOutcome>;

    /// Commits every staged write atomically.
    async fn commit(&mut self) -> AppResult<()>;
}

/// Repository port for ruleset grants and the materialized permission substrate.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    /// Opens a write transaction locking the group.
    async fn begin_group_sync(
        &self,
        group_id: GroupId,
    ) -> AppResult<Box<dyn GroupPermissionTransaction>>;

    /// Finds the stored grant of a ruleset to a group.
    async fn find_grant(
        &self,
        group_id: GroupId,
        ruleset: RulesetName,
    ) -> AppResult<Option<PermissionGrant>>;

    /// Lists every stored grant of a group in one batch.
    async fn list_grants_for_group(&self, group_id: GroupId) -> AppResult<Vec<PermissionGrant>>;

    /// Lists the grants of one ruleset across several groups.
    async fn list_grants_for_groups(
        &self,
        group_ids: &[GroupId],
        ruleset: RulesetName,
    ) -> AppResult<Vec<PermissionGrant>>;

    /// Lists the union of materialized permissions of several groups.
    async fn list_permissions_for_groups(
        &self,
        group_ids: &[GroupId],
    ) -> AppResult<BTreeSet<ModelPermission>>;

    /// Deletes every grant and materialized permission of a group.
    async fn delete_group_permissions(&self, group_id: GroupId) -> AppResult<()>;
}

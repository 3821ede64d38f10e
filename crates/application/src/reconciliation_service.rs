use std::sync::Arc;

use rolegate_core::{AppError, AppResult, GroupId};
use rolegate_domain::{ModelPermission, PermissionGrant, ReconciliationPlan, RuleTable, RulesetName};
use tracing::{debug, info, warn};

use crate::{
    GroupPermissionTransaction, IdentityRepository, PermissionRepository, PermissionWriteOutcome,
    ReconciliationReport,
};

mod locks;

pub(crate) use locks::GroupLockRegistry;

/// Materializes ruleset grants into the group permission substrate.
#[derive(Clone)]
pub struct GroupPermissionReconciler {
    repository: Arc<dyn PermissionRepository>,
    identity: Arc<dyn IdentityRepository>,
    rule_table: Arc<RuleTable>,
    locks: Arc<GroupLockRegistry>,
}

impl GroupPermissionReconciler {
    /// Creates a reconciler over a rule table.
    #[must_use]
    pub fn new(
        repository: Arc<dyn PermissionRepository>,
        identity: Arc<dyn IdentityRepository>,
        rule_table: Arc<RuleTable>,
    ) -> Self {
        Self {
            repository,
            identity,
            rule_table,
            locks: Arc::new(GroupLockRegistry::default()),
        }
    }

    /// Returns the rule table driving reconciliation.
    #[must_use]
    pub fn rule_table(&self) -> &Arc<RuleTable> {
        &self.rule_table
    }

    /// Brings one group's substrate in line with its grants.
    pub async fn reconcile(&self, group_id: GroupId) -> AppResult<ReconciliationReport> {
        self.sync_group(group_id, None).await
    }

    /// Reconciles every known group. A failing group is logged and skipped.
    pub async fn reconcile_all(&self) -> AppResult<Vec<ReconciliationReport>> {
        let group_ids = self.identity.list_group_ids().await?;
        let mut reports = Vec::with_capacity(group_ids.len());

        for group_id in group_ids {
            match self.reconcile(group_id).await {
                Ok(report) => reports.push(report),
                Err(error) => {
                    warn!(group_id = %group_id, error = %error, "group reconciliation failed");
                }
            }
        }

        Ok(reports)
    }

    /// Persists an optional grant update and reconciles in one transaction.
    pub(crate) async fn sync_group(
        &self,
        group_id: GroupId,
        update: Option<&PermissionGrant>,
    ) -> AppResult<ReconciliationReport> {
        let _guard = self.locks.acquire(group_id).await;
        // Checked under the lock so a concurrent deletion is observed.
        if !self.identity.group_exists(group_id).await? {
            return Err(AppError::NotFound(format!("group '{group_id}' does not exist")));
        }

        let mut transaction = self.repository.begin_group_sync(group_id).await?;

        let grants = self
            .prepare_grants(transaction.as_mut(), group_id, update)
            .await?;
        let current = transaction.load_permissions().await?;
        let plan = ReconciliationPlan::compute(&self.rule_table, &grants, &current);

        let mut report = ReconciliationReport {
            group_id,
            added: Vec::new(),
            removed: Vec::new(),
            unresolved: Vec::new(),
        };

        for permission in plan.to_add() {
            let outcome = transaction.add_permission(permission).await?;
            record_write(&mut report, group_id, permission, outcome, WriteKind::Add);
        }

        for permission in plan.to_remove() {
            let outcome = transaction.remove_permission(permission).await?;
            record_write(&mut report, group_id, permission, outcome, WriteKind::Remove);
        }

        transaction.commit().await?;

        if report.changed() {
            info!(
                group_id = %group_id,
                added = report.added.len(),
                removed = report.removed.len(),
                "applied group permission changes"
            );
        } else {
            debug!(group_id = %group_id, "group permissions already up to date");
        }

        Ok(report)
    }

    /// Removes a deleted group's grants and permissions, serialized with
    /// any reconciliation of the same group.
    pub async fn delete_group(&self, group_id: GroupId) -> AppResult<()> {
        let guard = self.locks.acquire(group_id).await;
        self.repository.delete_group_permissions(group_id).await?;
        self.locks.forget(group_id).await;
        drop(guard);

        debug!(group_id = %group_id, "deleted group permissions");
        Ok(())
    }

    async fn prepare_grants(
        &self,
        transaction: &mut dyn GroupPermissionTransaction,
        group_id: GroupId,
        update: Option<&PermissionGrant>,
    ) -> AppResult<Vec<PermissionGrant>> {
        let mut grants = transaction.load_grants().await?;

        for ruleset in RulesetName::all() {
            if grants.iter().any(|grant| grant.ruleset() == *ruleset)
                || update.is_some_and(|grant| grant.ruleset() == *ruleset)
            {
                continue;
            }

            let grant = PermissionGrant::empty(group_id, *ruleset);
            transaction.save_grant(&grant).await?;
            grants.push(grant);
        }

        if let Some(update) = update {
            transaction.save_grant(update).await?;
            grants.retain(|grant| grant.ruleset() != update.ruleset());
            grants.push(update.clone());
        }

        Ok(grants)
    }
}

#[derive(Clone, Copy)]
enum WriteKind {
    Add,
    Remove,
}

fn record_write(
    report: &mut ReconciliationReport,
    group_id: GroupId,
    permission: &ModelPermission,
    outcome: PermissionWriteOutcome,
    kind: WriteKind,
) {
    match (outcome, kind) {
        (PermissionWriteOutcome::Applied, WriteKind::Add) => report.added.push(permission.clone()),
        (PermissionWriteOutcome::Applied, WriteKind::Remove) => {
            report.removed.push(permission.clone());
        }
        (PermissionWriteOutcome::Unresolved, _) => {
            warn!(
                group_id = %group_id,
                permission = %permission.natural_key(),
                "skipping unresolved permission object"
            );
            report.unresolved.push(permission.clone());
        }
    }
}

#[cfg(test)]
mod tests;

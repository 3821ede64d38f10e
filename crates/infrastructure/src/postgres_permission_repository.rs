use std::collections::BTreeSet;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use rolegate_application::{GroupPermissionTransaction, PermissionRepository};
use rolegate_core::{AppError, AppResult, GroupId};
use rolegate_domain::{
    ModelPermission, PermissionAction, PermissionGrant, RuleFlags, RulesetName, TableName,
};

mod transaction;

use transaction::PostgresGroupPermissionTransaction;

/// PostgreSQL-backed repository for ruleset grants and group permissions.
#[derive(Clone)]
pub struct PostgresPermissionRepository {
    pool: PgPool,
}

impl PostgresPermissionRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Registers permission objects so that reconciliation can resolve them.
    ///
    /// Returns the number of newly created rows.
    pub async fn register_permissions(
        &self,
        permissions: &BTreeSet<ModelPermission>,
    ) -> AppResult<u64> {
        let app_labels: Vec<String> = permissions
            .iter()
            .map(|permission| permission.table().app_label().to_owned())
            .collect();
        let codenames: Vec<String> = permissions
            .iter()
            .map(ModelPermission::codename)
            .collect();

        let result = sqlx::query(
            r#"
            INSERT INTO rbac_permissions (app_label, codename)
            SELECT app_label, codename
            FROM UNNEST($1::TEXT[], $2::TEXT[]) AS input(app_label, codename)
            ON CONFLICT (app_label, codename) DO NOTHING
            "#,
        )
        .bind(app_labels)
        .bind(codenames)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to register permissions: {error}")))?;

        debug!(created = result.rows_affected(), "registered permission objects");
        Ok(result.rows_affected())
    }
}

#[derive(Debug, FromRow)]
struct GrantRow {
    group_id: uuid::Uuid,
    ruleset: String,
    can_view: bool,
    can_add: bool,
    can_change: bool,
    can_delete: bool,
}

impl GrantRow {
    fn into_grant(self) -> AppResult<PermissionGrant> {
        let ruleset = RulesetName::from_str(self.ruleset.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid ruleset '{}' stored for group '{}': {error}",
                self.ruleset, self.group_id
            ))
        })?;

        Ok(PermissionGrant::new(
            GroupId::from_uuid(self.group_id),
            ruleset,
            RuleFlags {
                can_view: self.can_view,
                can_add: self.can_add,
                can_change: self.can_change,
                can_delete: self.can_delete,
            },
        ))
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    app_label: String,
    codename: String,
}

/// Maps a stored `(app_label, codename)` pair back to a model permission.
///
/// Custom codenames that are not `<action>_<model>` yield `None`; they are
/// outside every ruleset and never reconciled.
fn model_permission_from_row(row: &PermissionRow) -> Option<ModelPermission> {
    let (action, model) = row.codename.split_once('_')?;
    let action = PermissionAction::from_str(action).ok()?;
    let table = TableName::new(format!("{}_{model}", row.app_label)).ok()?;

    Some(ModelPermission::new(table, action))
}

fn collect_permissions(rows: &[PermissionRow]) -> BTreeSet<ModelPermission> {
    rows.iter().filter_map(model_permission_from_row).collect()
}

fn group_uuids(group_ids: &[GroupId]) -> Vec<uuid::Uuid> {
    group_ids.iter().map(GroupId::as_uuid).collect()
}

#[async_trait]
impl PermissionRepository for PostgresPermissionRepository {
    async fn begin_group_sync(
        &self,
        group_id: GroupId,
    ) -> AppResult<Box<dyn GroupPermissionTransaction>> {
        let transaction = PostgresGroupPermissionTransaction::begin(&self.pool, group_id).await?;
        Ok(Box::new(transaction))
    }

    async fn find_grant(
        &self,
        group_id: GroupId,
        ruleset: RulesetName,
    ) -> AppResult<Option<PermissionGrant>> {
        sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT group_id, ruleset, can_view, can_add, can_change, can_delete
            FROM rbac_ruleset_grants
            WHERE group_id = $1 AND ruleset = $2
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(ruleset.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find ruleset grant: {error}")))?
        .map(GrantRow::into_grant)
        .transpose()
    }

    async fn list_grants_for_group(&self, group_id: GroupId) -> AppResult<Vec<PermissionGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT group_id, ruleset, can_view, can_add, can_change, can_delete
            FROM rbac_ruleset_grants
            WHERE group_id = $1
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list ruleset grants: {error}")))?;

        rows.into_iter().map(GrantRow::into_grant).collect()
    }

    async fn list_grants_for_groups(
        &self,
        group_ids: &[GroupId],
        ruleset: RulesetName,
    ) -> AppResult<Vec<PermissionGrant>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT group_id, ruleset, can_view, can_add, can_change, can_delete
            FROM rbac_ruleset_grants
            WHERE group_id = ANY($1) AND ruleset = $2
            "#,
        )
        .bind(group_uuids(group_ids))
        .bind(ruleset.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list ruleset grants for groups: {error}"))
        })?;

        rows.into_iter().map(GrantRow::into_grant).collect()
    }

    async fn list_permissions_for_groups(
        &self,
        group_ids: &[GroupId],
    ) -> AppResult<BTreeSet<ModelPermission>> {
        if group_ids.is_empty() {
            return Ok(BTreeSet::new());
        }

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT DISTINCT permissions.app_label, permissions.codename
            FROM rbac_group_permissions AS group_permissions
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = group_permissions.permission_id
            WHERE group_permissions.group_id = ANY($1)
            "#,
        )
        .bind(group_uuids(group_ids))
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list group permissions: {error}"))
        })?;

        Ok(collect_permissions(&rows))
    }

    async fn delete_group_permissions(&self, group_id: GroupId) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start group cleanup transaction: {error}"))
        })?;

        sqlx::query("DELETE FROM rbac_group_permissions WHERE group_id = $1")
            .bind(group_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete group permissions: {error}"))
            })?;

        sqlx::query("DELETE FROM rbac_ruleset_grants WHERE group_id = $1")
            .bind(group_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete ruleset grants: {error}"))
            })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit group cleanup: {error}"))
        })
    }
}

#[cfg(test)]
mod tests;

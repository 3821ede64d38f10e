use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use rolegate_application::{GroupPermissionTransaction, PermissionWriteOutcome};
use rolegate_core::{AppError, AppResult, GroupId};
use rolegate_domain::{ModelPermission, PermissionGrant};

use super::{GrantRow, PermissionRow, collect_permissions};

/// Write transaction holding a row lock on one group.
pub(super) struct PostgresGroupPermissionTransaction {
    group_id: GroupId,
    transaction: Option<Transaction<'static, Postgres>>,
}

impl PostgresGroupPermissionTransaction {
    pub(super) async fn begin(pool: &PgPool, group_id: GroupId) -> AppResult<Self> {
        let mut transaction = pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to start group sync transaction: {error}"))
        })?;

        let locked = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT id
            FROM auth_groups
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_optional(&mut *transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to lock group: {error}")))?;

        if locked.is_none() {
            return Err(AppError::NotFound(format!(
                "group '{group_id}' does not exist"
            )));
        }

        Ok(Self {
            group_id,
            transaction: Some(transaction),
        })
    }

    fn active(&mut self) -> AppResult<&mut Transaction<'static, Postgres>> {
        self.transaction.as_mut().ok_or_else(|| {
            AppError::Internal("group sync transaction was already committed".to_owned())
        })
    }

    async fn find_permission_id(&mut self, permission: &ModelPermission) -> AppResult<Option<i64>> {
        let app_label = permission.table().app_label().to_owned();
        let codename = permission.codename();
        let transaction = self.active()?;

        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM rbac_permissions
            WHERE app_label = $1 AND codename = $2
            "#,
        )
        .bind(app_label)
        .bind(codename)
        .fetch_optional(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to resolve permission: {error}")))
    }
}

#[async_trait]
impl GroupPermissionTransaction for PostgresGroupPermissionTransaction {
    async fn load_grants(&mut self) -> AppResult<Vec<PermissionGrant>> {
        let group_id = self.group_id;
        let transaction = self.active()?;

        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT group_id, ruleset, can_view, can_add, can_change, can_delete
            FROM rbac_ruleset_grants
            WHERE group_id = $1
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load ruleset grants: {error}")))?;

        rows.into_iter().map(GrantRow::into_grant).collect()
    }

    async fn load_permissions(&mut self) -> AppResult<BTreeSet<ModelPermission>> {
        let group_id = self.group_id;
        let transaction = self.active()?;

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT permissions.app_label, permissions.codename
            FROM rbac_group_permissions AS group_permissions
            INNER JOIN rbac_permissions AS permissions
                ON permissions.id = group_permissions.permission_id
            WHERE group_permissions.group_id = $1
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load group permissions: {error}"))
        })?;

        Ok(collect_permissions(&rows))
    }

    async fn save_grant(&mut self, grant: &PermissionGrant) -> AppResult<()> {
        let flags = grant.flags();
        let transaction = self.active()?;

        sqlx::query(
            r#"
            INSERT INTO rbac_ruleset_grants (
                group_id, ruleset, can_view, can_add, can_change, can_delete
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (group_id, ruleset) DO UPDATE
            SET can_view = EXCLUDED.can_view,
                can_add = EXCLUDED.can_add,
                can_change = EXCLUDED.can_change,
                can_delete = EXCLUDED.can_delete,
                updated_at = now()
            "#,
        )
        .bind(grant.group_id().as_uuid())
        .bind(grant.ruleset().as_str())
        .bind(flags.can_view)
        .bind(flags.can_add)
        .bind(flags.can_change)
        .bind(flags.can_delete)
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save ruleset grant: {error}")))?;

        Ok(())
    }

    async fn add_permission(
        &mut self,
        permission: &ModelPermission,
    ) -> AppResult<PermissionWriteOutcome> {
        let Some(permission_id) = self.find_permission_id(permission).await? else {
            return Ok(PermissionWriteOutcome::Unresolved);
        };
        let group_id = self.group_id;
        let transaction = self.active()?;

        sqlx::query(
            r#"
            INSERT INTO rbac_group_permissions (group_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (group_id, permission_id) DO NOTHING
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(permission_id)
        .execute(&mut **transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to add group permission: {error}")))?;

        Ok(PermissionWriteOutcome::Applied)
    }

    async fn remove_permission(
        &mut self,
        permission: &ModelPermission,
    ) -> AppResult<PermissionWriteOutcome> {
        let Some(permission_id) = self.find_permission_id(permission).await? else {
            return Ok(PermissionWriteOutcome::Unresolved);
        };
        let group_id = self.group_id;
        let transaction = self.active()?;

        sqlx::query(
            r#"
            DELETE FROM rbac_group_permissions
            WHERE group_id = $1 AND permission_id = $2
            "#,
        )
        .bind(group_id.as_uuid())
        .bind(permission_id)
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to remove group permission: {error}"))
        })?;

        Ok(PermissionWriteOutcome::Applied)
    }

    async fn commit(&mut self) -> AppResult<()> {
        let transaction = self.transaction.take().ok_or_else(|| {
            AppError::Internal("group sync transaction was already committed".to_owned())
        })?;

        transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit group sync transaction: {error}"))
        })?;

        debug!(group_id = %self.group_id, "committed group sync transaction");
        Ok(())
    }
}

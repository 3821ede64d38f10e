use std::sync::Arc;

use rolegate_core::{AppError, AppResult, UserIdentity};
use rolegate_domain::{ModelPermission, PermissionAction, RuleTable, RulesetName, TableName};

use crate::{IdentityRepository, PermissionRepository, RolePermissionCache};

mod roles;
mod tables;

/// Application service answering permission questions for users.
#[derive(Clone)]
pub struct AuthorizationService {
    permissions: Arc<dyn PermissionRepository>,
    identity: Arc<dyn IdentityRepository>,
    rule_table: Arc<RuleTable>,
    role_cache: Option<Arc<dyn RolePermissionCache>>,
    role_cache_ttl_seconds: u32,
}

impl AuthorizationService {
    /// Creates an authorization service without caching.
    #[must_use]
    pub fn new(
        permissions: Arc<dyn PermissionRepository>,
        identity: Arc<dyn IdentityRepository>,
        rule_table: Arc<RuleTable>,
    ) -> Self {
        Self {
            permissions,
            identity,
            rule_table,
            role_cache: None,
            role_cache_ttl_seconds: 0,
        }
    }

    /// Configures the optional role permission cache.
    #[must_use]
    pub fn with_role_cache(
        mut self,
        cache: Arc<dyn RolePermissionCache>,
        ttl_seconds: u32,
    ) -> Self {
        self.role_cache = Some(cache);
        self.role_cache_ttl_seconds = ttl_seconds;
        self
    }

    /// Ensures the user may perform an action on a table.
    pub async fn require_table_permission(
        &self,
        user: Option<&UserIdentity>,
        table: &TableName,
        action: PermissionAction,
    ) -> AppResult<()> {
        if self.has_table_permission(user, table, action).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "{} is missing permission '{}' on table '{table}'",
            describe_user(user),
            action.as_str()
        )))
    }

    /// Ensures the user holds an action through a ruleset.
    pub async fn require_role_permission(
        &self,
        user: Option<&UserIdentity>,
        ruleset: RulesetName,
        action: PermissionAction,
    ) -> AppResult<()> {
        if self.has_role_permission(user, ruleset, action).await? {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "{} is missing role permission '{}' on ruleset '{ruleset}'",
            describe_user(user),
            action.as_str()
        )))
    }

    /// Returns whether the user's groups hold a materialized permission.
    pub async fn has_model_permission(
        &self,
        user: Option<&UserIdentity>,
        permission: &ModelPermission,
    ) -> AppResult<bool> {
        let Some(user) = user else {
            return Ok(false);
        };

        if user.is_superuser() {
            return Ok(true);
        }

        let group_ids = self.identity.list_groups_for_user(user.user_id()).await?;
        if group_ids.is_empty() {
            return Ok(false);
        }

        Ok(self
            .permissions
            .list_permissions_for_groups(&group_ids)
            .await?
            .contains(permission))
    }
}

fn describe_user(user: Option<&UserIdentity>) -> String {
    match user {
        Some(user) => format!("user '{}'", user.username()),
        None => "anonymous user".to_owned(),
    }
}

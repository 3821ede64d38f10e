use rolegate_core::{AppResult, UserIdentity};
use rolegate_domain::{PermissionAction, TableName};
use tracing::debug;

use super::AuthorizationService;

impl AuthorizationService {
    /// Returns whether the user may perform an action on a table.
    ///
    /// Exempt tables are open to every authenticated user. A child table of
    /// an inheritance pair is also granted when the user may change the
    /// parent table.
    pub async fn has_table_permission(
        &self,
        user: Option<&UserIdentity>,
        table: &TableName,
        action: PermissionAction,
    ) -> AppResult<bool> {
        let Some(identity) = user else {
            return Ok(false);
        };

        if identity.is_superuser() || self.rule_table.is_exempt(table) {
            return Ok(true);
        }

        for ruleset in self.rule_table.rulesets_governing(table) {
            if self.has_role_permission(user, ruleset, action).await? {
                return Ok(true);
            }
        }

        for rule in self.rule_table.inheritance_pairs() {
            if rule.child_table() != table {
                continue;
            }

            for ruleset in self.rule_table.rulesets_governing(rule.parent_table()) {
                if self
                    .has_role_permission(user, ruleset, PermissionAction::Change)
                    .await?
                {
                    return Ok(true);
                }
            }
        }

        debug!(
            user_id = %identity.user_id(),
            table = %table,
            action = action.as_str(),
            "table permission check failed"
        );

        Ok(false)
    }
}

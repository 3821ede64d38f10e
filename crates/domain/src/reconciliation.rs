//! Desired-versus-actual diffing of a group's materialized permissions.

use std::collections::{BTreeSet, HashMap};

use crate::grant::{PermissionGrant, RuleFlags};
use crate::rule_table::RuleTable;
use crate::ruleset::{ModelPermission, PermissionAction, RulesetName};

/// Minimal change set bringing a group's permissions in line with its grants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    desired: BTreeSet<ModelPermission>,
    to_add: BTreeSet<ModelPermission>,
    to_remove: BTreeSet<ModelPermission>,
}

impl ReconciliationPlan {
    /// Computes the plan for one group.
    ///
    /// A permission is desired when any ruleset governing its table grants
    /// the action, or when the table inherits from a parent whose `change`
    /// permission is desired. Rulesets without a grant row count as granting
    /// nothing. Permissions outside the rule table's universe are never
    /// touched.
    #[must_use]
    pub fn compute(
        rule_table: &RuleTable,
        grants: &[PermissionGrant],
        current: &BTreeSet<ModelPermission>,
    ) -> Self {
        let flags_by_ruleset: HashMap<RulesetName, RuleFlags> = grants
            .iter()
            .map(|grant| (grant.ruleset(), grant.flags()))
            .collect();

        let mut desired = BTreeSet::new();
        let mut undesired = BTreeSet::new();

        for ruleset in RulesetName::all() {
            let flags = flags_by_ruleset
                .get(ruleset)
                .copied()
                .unwrap_or_else(RuleFlags::none);

            for table in rule_table.governed_tables(*ruleset) {
                for action in PermissionAction::all() {
                    let permission = ModelPermission::new(table.clone(), *action);
                    if flags.allows(*action) {
                        undesired.remove(&permission);
                        desired.insert(permission);
                    } else if !desired.contains(&permission) {
                        undesired.insert(permission);
                    }
                }
            }
        }

        for rule in rule_table.inheritance_pairs() {
            let parent_change =
                ModelPermission::new(rule.parent_table().clone(), PermissionAction::Change);
            if !desired.contains(&parent_change) {
                continue;
            }

            for action in PermissionAction::all() {
                let permission = ModelPermission::new(rule.child_table().clone(), *action);
                undesired.remove(&permission);
                desired.insert(permission);
            }
        }

        let to_add = desired.difference(current).cloned().collect();
        let to_remove = undesired
            .iter()
            .filter(|permission| current.contains(*permission) && !desired.contains(*permission))
            .cloned()
            .collect();

        Self {
            desired,
            to_add,
            to_remove,
        }
    }

    /// Returns every permission the grants justify.
    #[must_use]
    pub fn desired(&self) -> &BTreeSet<ModelPermission> {
        &self.desired
    }

    /// Returns permissions missing from the current state.
    #[must_use]
    pub fn to_add(&self) -> &BTreeSet<ModelPermission> {
        &self.to_add
    }

    /// Returns permissions present but no longer justified.
    #[must_use]
    pub fn to_remove(&self) -> &BTreeSet<ModelPermission> {
        &self.to_remove
    }

    /// Returns whether applying the plan would change nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Returns the state obtained by applying the plan to `current`.
    #[must_use]
    pub fn apply_to(&self, current: &BTreeSet<ModelPermission>) -> BTreeSet<ModelPermission> {
        current
            .iter()
            .filter(|permission| !self.to_remove.contains(*permission))
            .chain(self.to_add.iter())
            .cloned()
            .collect()
    }
}

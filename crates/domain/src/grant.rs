use rolegate_core::GroupId;
use serde::{Deserialize, Serialize};

use crate::ruleset::{PermissionAction, RulesetName};

/// The four CRUD flags of a ruleset grant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleFlags {
    /// Permission to view items.
    pub can_view: bool,
    /// Permission to add items.
    pub can_add: bool,
    /// Permission to edit items.
    pub can_change: bool,
    /// Permission to delete items.
    pub can_delete: bool,
}

impl RuleFlags {
    /// Flags granting nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            can_view: false,
            can_add: false,
            can_change: false,
            can_delete: false,
        }
    }

    /// Flags granting every action.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            can_view: true,
            can_add: true,
            can_change: true,
            can_delete: true,
        }
    }

    /// Applies the write-time implications.
    ///
    /// Adding, changing or deleting implies viewing; adding or deleting
    /// implies changing.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut flags = self;

        if flags.can_add || flags.can_change || flags.can_delete {
            flags.can_view = true;
        }

        if flags.can_add || flags.can_delete {
            flags.can_change = true;
        }

        flags
    }

    /// Returns whether the flags grant the action.
    #[must_use]
    pub fn allows(&self, action: PermissionAction) -> bool {
        match action {
            PermissionAction::View => self.can_view,
            PermissionAction::Add => self.can_add,
            PermissionAction::Change => self.can_change,
            PermissionAction::Delete => self.can_delete,
        }
    }
}

/// Persisted CRUD grant of one ruleset to one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    group_id: GroupId,
    ruleset: RulesetName,
    flags: RuleFlags,
}

impl PermissionGrant {
    /// Creates a grant, normalizing the flags.
    #[must_use]
    pub fn new(group_id: GroupId, ruleset: RulesetName, flags: RuleFlags) -> Self {
        Self {
            group_id,
            ruleset,
            flags: flags.normalized(),
        }
    }

    /// Creates the default grant materialized on first reference.
    #[must_use]
    pub fn empty(group_id: GroupId, ruleset: RulesetName) -> Self {
        Self::new(group_id, ruleset, RuleFlags::none())
    }

    /// Returns the owning group.
    #[must_use]
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Returns the granted ruleset.
    #[must_use]
    pub fn ruleset(&self) -> RulesetName {
        self.ruleset
    }

    /// Returns the normalized flags.
    #[must_use]
    pub fn flags(&self) -> RuleFlags {
        self.flags
    }

    /// Returns whether the grant allows the action.
    #[must_use]
    pub fn allows(&self, action: PermissionAction) -> bool {
        self.flags.allows(action)
    }

    /// Returns a fixed-width rendering for debug logs.
    #[must_use]
    pub fn describe(&self) -> String {
        format!(
            "{:<15}: {:<15} | v: {:<5} | a: {:<5} | c: {:<5} | d: {:<5}",
            self.group_id.to_string(),
            self.ruleset.label(),
            self.flags.can_view,
            self.flags.can_add,
            self.flags.can_change,
            self.flags.can_delete
        )
    }
}

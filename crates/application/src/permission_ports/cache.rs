use async_trait::async_trait;
use rolegate_core::{AppResult, UserId};
use rolegate_domain::{PermissionAction, RulesetName};

/// Cache key of one role permission answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RolePermissionCacheKey {
    /// Queried user.
    pub user_id: UserId,
    /// Queried ruleset.
    pub ruleset: RulesetName,
    /// Queried action.
    pub action: PermissionAction,
}

impl RolePermissionCacheKey {
    /// Creates a cache key.
    #[must_use]
    pub fn new(user_id: UserId, ruleset: RulesetName, action: PermissionAction) -> Self {
        Self {
            user_id,
            ruleset,
            action,
        }
    }

    /// Returns every key of the given users and rulesets, across all actions.
    #[must_use]
    pub fn all_for(user_ids: &[UserId], rulesets: &[RulesetName]) -> Vec<Self> {
        user_ids
            .iter()
            .flat_map(|user_id| {
                rulesets.iter().flat_map(move |ruleset| {
                    PermissionAction::all()
                        .iter()
                        .map(move |action| Self::new(*user_id, *ruleset, *action))
                })
            })
            .collect()
    }

    /// Returns the flat storage key, e.g. `role_<user>_part_view`.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!(
            "role_{}_{}_{}",
            self.user_id,
            self.ruleset.as_str(),
            self.action.as_str()
        )
    }
}

/// Optional cache port for role permission answers.
#[async_trait]
pub trait RolePermissionCache: Send + Sync {
    /// Returns a cached answer.
    async fn get_role_permission(&self, key: RolePermissionCacheKey) -> AppResult<Option<bool>>;

    /// Stores an answer with ttl.
    async fn set_role_permission(
        &self,
        key: RolePermissionCacheKey,
        allowed: bool,
        ttl_seconds: u32,
    ) -> AppResult<()>;

    /// Drops cached answers.
    async fn remove_role_permissions(&self, keys: &[RolePermissionCacheKey]) -> AppResult<()>;
}

//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod api_token;
mod grant;
mod owner;
mod profile;
mod reconciliation;
mod rule_table;
mod ruleset;

pub use api_token::{
    API_TOKEN_DEFAULT_VALIDITY_DAYS, API_TOKEN_MAX_LENGTH, API_TOKEN_MIN_LENGTH,
    API_TOKEN_NAME_MAX_LENGTH, API_TOKEN_PREFIX, ApiToken, IssuedApiToken, default_expiry,
    generate_key, redact_key, sanitize_name,
};
pub use grant::{PermissionGrant, RuleFlags};
pub use owner::{Owner, OwnerId, OwnerKind, OwnerSubject};
pub use profile::{UserProfile, UserType};
pub use reconciliation::ReconciliationPlan;
pub use rule_table::{InheritanceRule, RuleTable, RuleTableOptions};
pub use ruleset::{ModelPermission, PermissionAction, RulesetName, TableName};

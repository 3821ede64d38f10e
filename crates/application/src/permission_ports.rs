mod cache;
mod grants;
mod identity;

pub use cache::{RolePermissionCache, RolePermissionCacheKey};
pub use grants::{
    GroupPermissionTransaction, PermissionRepository, PermissionWriteOutcome,
    ReconciliationReport,
};
pub use identity::IdentityRepository;

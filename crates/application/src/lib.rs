//! Application services and ports.

#![forbid(unsafe_code)]

mod authorization_service;
mod owner_service;
mod permission_ports;
mod permission_service;
mod reconciliation_service;
mod subject_lifecycle_service;
mod subject_ports;
mod user_profile_service;

#[cfg(test)]
mod test_support;

pub use authorization_service::AuthorizationService;
pub use owner_service::OwnerService;
pub use permission_ports::{
    GroupPermissionTransaction, IdentityRepository, PermissionRepository, PermissionWriteOutcome,
    ReconciliationReport, RolePermissionCache, RolePermissionCacheKey,
};
pub use permission_service::PermissionService;
pub use reconciliation_service::GroupPermissionReconciler;
pub use subject_lifecycle_service::{LifecycleMode, SubjectLifecycleService};
pub use subject_ports::{OwnerRepository, UpdateUserProfileInput, UserProfileRepository};
pub use user_profile_service::UserProfileService;

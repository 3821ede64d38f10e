//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_identity_repository;
mod in_memory_owner_repository;
mod in_memory_permission_repository;
mod in_memory_role_permission_cache;
mod in_memory_user_profile_repository;
mod postgres_identity_repository;
mod postgres_owner_repository;
mod postgres_permission_repository;
mod postgres_user_profile_repository;
mod redis_role_permission_cache;

pub use in_memory_identity_repository::InMemoryIdentityRepository;
pub use in_memory_owner_repository::InMemoryOwnerRepository;
pub use in_memory_permission_repository::InMemoryPermissionRepository;
pub use in_memory_role_permission_cache::InMemoryRolePermissionCache;
pub use in_memory_user_profile_repository::InMemoryUserProfileRepository;
pub use postgres_identity_repository::PostgresIdentityRepository;
pub use postgres_owner_repository::PostgresOwnerRepository;
pub use postgres_permission_repository::PostgresPermissionRepository;
pub use postgres_user_profile_repository::PostgresUserProfileRepository;
pub use redis_role_permission_cache::RedisRolePermissionCache;

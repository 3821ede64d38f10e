use async_trait::async_trait;
use sqlx::PgPool;

use rolegate_application::IdentityRepository;
use rolegate_core::{AppError, AppResult, GroupId, UserId, UserIdentity};

/// PostgreSQL-backed read access to users, groups and memberships.
#[derive(Clone)]
pub struct PostgresIdentityRepository {
    pool: PgPool,
}

impl PostgresIdentityRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the identity of a user.
    pub async fn find_user(&self, user_id: UserId) -> AppResult<Option<UserIdentity>> {
        let row = sqlx::query_as::<_, (String, bool)>(
            r#"
            SELECT username, is_superuser
            FROM auth_users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?;

        Ok(row.map(|(username, is_superuser)| {
            if is_superuser {
                UserIdentity::superuser(user_id, username)
            } else {
                UserIdentity::new(user_id, username)
            }
        }))
    }
}

#[async_trait]
impl IdentityRepository for PostgresIdentityRepository {
    async fn group_exists(&self, group_id: GroupId) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM auth_groups WHERE id = $1)")
            .bind(group_id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to check group: {error}")))
    }

    async fn list_group_ids(&self) -> AppResult<Vec<GroupId>> {
        let rows = sqlx::query_scalar::<_, uuid::Uuid>("SELECT id FROM auth_groups ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to list groups: {error}")))?;

        Ok(rows.into_iter().map(GroupId::from_uuid).collect())
    }

    async fn list_groups_for_user(&self, user_id: UserId) -> AppResult<Vec<GroupId>> {
        let rows = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT group_id
            FROM auth_group_members
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list group memberships: {error}"))
        })?;

        Ok(rows.into_iter().map(GroupId::from_uuid).collect())
    }

    async fn list_users_in_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        let rows = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT user_id
            FROM auth_group_members
            WHERE group_id = $1
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list group members: {error}")))?;

        Ok(rows.into_iter().map(UserId::from_uuid).collect())
    }

    async fn find_username(&self, user_id: UserId) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT username FROM auth_users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to find username: {error}")))
    }

    async fn find_group_name(&self, group_id: GroupId) -> AppResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT name FROM auth_groups WHERE id = $1")
            .bind(group_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|error| AppError::Internal(format!("failed to find group name: {error}")))
    }
}

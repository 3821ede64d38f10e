use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use rolegate_application::UserProfileRepository;
use rolegate_core::{AppError, AppResult, GroupId, UserId};
use rolegate_domain::{UserProfile, UserType};

/// PostgreSQL-backed user profiles.
#[derive(Clone)]
pub struct PostgresUserProfileRepository {
    pool: PgPool,
}

impl PostgresUserProfileRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserProfileRow {
    user_id: uuid::Uuid,
    display_name: Option<String>,
    position: Option<String>,
    language: Option<String>,
    status: Option<String>,
    location: Option<String>,
    contact: Option<String>,
    organisation: Option<String>,
    active: bool,
    user_type: String,
    primary_group_id: Option<uuid::Uuid>,
    theme: Option<Value>,
    widgets: Option<Value>,
}

impl TryFrom<UserProfileRow> for UserProfile {
    type Error = AppError;

    fn try_from(row: UserProfileRow) -> Result<Self, Self::Error> {
        let user_type = UserType::from_str(row.user_type.as_str()).map_err(|error| {
            AppError::Internal(format!(
                "invalid user type stored for user '{}': {error}",
                row.user_id
            ))
        })?;

        Ok(Self {
            user_id: UserId::from_uuid(row.user_id),
            display_name: row.display_name,
            position: row.position,
            language: row.language,
            status: row.status,
            location: row.location,
            contact: row.contact,
            organisation: row.organisation,
            active: row.active,
            user_type,
            primary_group: row.primary_group_id.map(GroupId::from_uuid),
            theme: row.theme,
            widgets: row.widgets,
        })
    }
}

#[async_trait]
impl UserProfileRepository for PostgresUserProfileRepository {
    async fn find_profile(&self, user_id: UserId) -> AppResult<Option<UserProfile>> {
        sqlx::query_as::<_, UserProfileRow>(
            r#"
            SELECT
                user_id,
                display_name,
                position,
                language,
                status,
                location,
                contact,
                organisation,
                active,
                user_type,
                primary_group_id,
                theme,
                widgets
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user profile: {error}")))?
        .map(UserProfile::try_from)
        .transpose()
    }

    async fn save_profile(&self, profile: &UserProfile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles (
                user_id,
                display_name,
                position,
                language,
                status,
                location,
                contact,
                organisation,
                active,
                user_type,
                primary_group_id,
                theme,
                widgets
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (user_id) DO UPDATE
            SET display_name = EXCLUDED.display_name,
                position = EXCLUDED.position,
                language = EXCLUDED.language,
                status = EXCLUDED.status,
                location = EXCLUDED.location,
                contact = EXCLUDED.contact,
                organisation = EXCLUDED.organisation,
                active = EXCLUDED.active,
                user_type = EXCLUDED.user_type,
                primary_group_id = EXCLUDED.primary_group_id,
                theme = EXCLUDED.theme,
                widgets = EXCLUDED.widgets
            "#,
        )
        .bind(profile.user_id.as_uuid())
        .bind(profile.display_name.as_deref())
        .bind(profile.position.as_deref())
        .bind(profile.language.as_deref())
        .bind(profile.status.as_deref())
        .bind(profile.location.as_deref())
        .bind(profile.contact.as_deref())
        .bind(profile.organisation.as_deref())
        .bind(profile.active)
        .bind(profile.user_type.as_str())
        .bind(profile.primary_group.map(|group_id| group_id.as_uuid()))
        .bind(profile.theme.as_ref())
        .bind(profile.widgets.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to save user profile: {error}")))?;

        Ok(())
    }

    async fn clear_primary_group(&self, group_id: GroupId) -> AppResult<Vec<UserId>> {
        let rows = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            UPDATE user_profiles
            SET primary_group_id = NULL
            WHERE primary_group_id = $1
            RETURNING user_id
            "#,
        )
        .bind(group_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to clear primary group: {error}"))
        })?;

        Ok(rows.into_iter().map(UserId::from_uuid).collect())
    }

    async fn delete_profile(&self, user_id: UserId) -> AppResult<()> {
        sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!("failed to delete user profile: {error}"))
            })?;

        Ok(())
    }
}

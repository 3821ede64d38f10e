use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use rolegate_application::OwnerRepository;
use rolegate_core::{AppError, AppResult};
use rolegate_domain::{Owner, OwnerId, OwnerKind, OwnerSubject};

/// PostgreSQL-backed owner registry.
#[derive(Clone)]
pub struct PostgresOwnerRepository {
    pool: PgPool,
}

impl PostgresOwnerRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct OwnerRow {
    id: uuid::Uuid,
    subject_kind: String,
    subject_id: uuid::Uuid,
}

impl OwnerRow {
    fn into_owner(self) -> AppResult<Owner> {
        let kind = OwnerKind::from_str(self.subject_kind.as_str()).map_err(|error| {
            AppError::Internal(format!("invalid owner kind for owner '{}': {error}", self.id))
        })?;

        Ok(Owner::new(
            OwnerId::from_uuid(self.id),
            OwnerSubject::from_parts(kind, self.subject_id),
        ))
    }
}

#[async_trait]
impl OwnerRepository for PostgresOwnerRepository {
    async fn find_owner(&self, subject: OwnerSubject) -> AppResult<Option<Owner>> {
        sqlx::query_as::<_, OwnerRow>(
            r#"
            SELECT id, subject_kind, subject_id
            FROM rbac_owners
            WHERE subject_kind = $1 AND subject_id = $2
            "#,
        )
        .bind(subject.kind().as_str())
        .bind(subject.subject_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find owner: {error}")))?
        .map(OwnerRow::into_owner)
        .transpose()
    }

    async fn insert_owner(&self, owner: Owner) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_owners (id, subject_kind, subject_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(owner.owner_id().as_uuid())
        .bind(owner.kind().as_str())
        .bind(owner.subject().subject_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| owner_conflict_or_internal(error, owner.subject()))?;

        Ok(())
    }

    async fn list_owners_for_subjects(&self, subjects: &[OwnerSubject]) -> AppResult<Vec<Owner>> {
        if subjects.is_empty() {
            return Ok(Vec::new());
        }

        let kinds: Vec<String> = subjects
            .iter()
            .map(|subject| subject.kind().as_str().to_owned())
            .collect();
        let subject_ids: Vec<uuid::Uuid> =
            subjects.iter().map(OwnerSubject::subject_uuid).collect();

        let rows = sqlx::query_as::<_, OwnerRow>(
            r#"
            SELECT owners.id, owners.subject_kind, owners.subject_id
            FROM UNNEST($1::TEXT[], $2::UUID[]) WITH ORDINALITY
                AS requested(subject_kind, subject_id, position)
            INNER JOIN rbac_owners AS owners
                ON owners.subject_kind = requested.subject_kind
                AND owners.subject_id = requested.subject_id
            ORDER BY requested.position
            "#,
        )
        .bind(kinds)
        .bind(subject_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list owners: {error}")))?;

        rows.into_iter().map(OwnerRow::into_owner).collect()
    }

    async fn delete_owner(&self, subject: OwnerSubject) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM rbac_owners
            WHERE subject_kind = $1 AND subject_id = $2
            "#,
        )
        .bind(subject.kind().as_str())
        .bind(subject.subject_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to delete owner: {error}")))?;

        Ok(result.rows_affected() > 0)
    }
}

fn owner_conflict_or_internal(error: sqlx::Error, subject: OwnerSubject) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!("owner for '{subject}' already exists"));
    }

    AppError::Internal(format!("failed to create owner: {error}"))
}

use std::sync::Arc;

use rolegate_application::{
    AuthorizationService, GroupPermissionReconciler, OwnerRepository, OwnerService,
    PermissionService, UpdateUserProfileInput, UserProfileRepository, UserProfileService,
};
use rolegate_core::{AppError, GroupId, UserId, UserIdentity};
use rolegate_domain::{
    ModelPermission, Owner, OwnerId, OwnerSubject, PermissionAction, RuleFlags, RuleTable,
    RulesetName, TableName,
};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use crate::{
    PostgresIdentityRepository, PostgresOwnerRepository, PostgresUserProfileRepository,
};

use super::PostgresPermissionRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(4)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres permission tests: {error}");
    }

    Some(pool)
}

async fn ensure_user(pool: &PgPool, user_id: UserId) {
    let insert = sqlx::query(
        r#"
            INSERT INTO auth_users (id, username)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
    )
    .bind(user_id.as_uuid())
    .bind(format!("user-{user_id}"))
    .execute(pool)
    .await;

    assert!(insert.is_ok());
}

async fn ensure_group(pool: &PgPool, group_id: GroupId, members: &[UserId]) {
    let insert = sqlx::query(
        r#"
            INSERT INTO auth_groups (id, name)
            VALUES ($1, $2)
            ON CONFLICT (id) DO NOTHING
            "#,
    )
    .bind(group_id.as_uuid())
    .bind(format!("group-{group_id}"))
    .execute(pool)
    .await;
    assert!(insert.is_ok());

    for member in members {
        ensure_user(pool, *member).await;
        let membership = sqlx::query(
            r#"
                INSERT INTO auth_group_members (group_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT DO NOTHING
                "#,
        )
        .bind(group_id.as_uuid())
        .bind(member.as_uuid())
        .execute(pool)
        .await;
        assert!(membership.is_ok());
    }
}

fn permission(table: &str, action: PermissionAction) -> ModelPermission {
    match TableName::new(table) {
        Ok(table) => ModelPermission::new(table, action),
        Err(error) => panic!("invalid table name '{table}': {error}"),
    }
}

fn services(pool: &PgPool) -> (PermissionService, AuthorizationService) {
    let repository = Arc::new(PostgresPermissionRepository::new(pool.clone()));
    let identity = Arc::new(PostgresIdentityRepository::new(pool.clone()));
    let reconciler =
        GroupPermissionReconciler::new(repository.clone(), identity.clone(), RuleTable::standard());

    (
        PermissionService::new(repository.clone(), identity.clone(), reconciler),
        AuthorizationService::new(repository, identity, RuleTable::standard()),
    )
}

#[tokio::test]
async fn set_flags_materializes_registered_permissions() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresPermissionRepository::new(pool.clone());
    assert!(
        repository
            .register_permissions(&RuleTable::standard().permission_universe())
            .await
            .is_ok()
    );

    let user_id = UserId::new();
    let group_id = GroupId::new();
    ensure_group(&pool, group_id, &[user_id]).await;
    let (permissions, authorization) = services(&pool);

    let grant = permissions
        .set_flags(
            group_id,
            RulesetName::Stock,
            RuleFlags {
                can_change: true,
                ..RuleFlags::none()
            },
        )
        .await;
    assert!(grant.is_ok());

    let user = UserIdentity::new(user_id, "stock-clerk");
    let stock_item = permission("stock_stockitem", PermissionAction::Change);
    let model = authorization.has_model_permission(Some(&user), &stock_item).await;
    let table = authorization
        .has_table_permission(Some(&user), stock_item.table(), PermissionAction::Delete)
        .await;

    assert_eq!(model.ok(), Some(true));
    assert_eq!(table.ok(), Some(false));

    let grants = permissions.list_grants(group_id).await;
    assert!(matches!(grants, Ok(ref grants) if grants.len() == RulesetName::all().len()));
}

#[tokio::test]
async fn second_reconcile_is_a_noop() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresPermissionRepository::new(pool.clone());
    assert!(
        repository
            .register_permissions(&RuleTable::standard().permission_universe())
            .await
            .is_ok()
    );
    let group_id = GroupId::new();
    ensure_group(&pool, group_id, &[]).await;
    let (permissions, _) = services(&pool);

    assert!(
        permissions
            .set_flags(group_id, RulesetName::Part, RuleFlags::all())
            .await
            .is_ok()
    );

    let identity = Arc::new(PostgresIdentityRepository::new(pool.clone()));
    let reconciler = GroupPermissionReconciler::new(
        Arc::new(repository),
        identity,
        RuleTable::standard(),
    );
    let report = reconciler.reconcile(group_id).await;

    assert!(matches!(report, Ok(ref report) if !report.changed()));
}

#[tokio::test]
async fn unknown_group_is_not_found() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let (permissions, _) = services(&pool);
    let result = permissions
        .set_flags(GroupId::new(), RulesetName::Admin, RuleFlags::all())
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn owner_insert_conflicts_per_subject() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let repository = PostgresOwnerRepository::new(pool.clone());
    let subject = OwnerSubject::User(UserId::new());

    assert!(
        repository
            .insert_owner(Owner::new(OwnerId::new(), subject))
            .await
            .is_ok()
    );
    let duplicate = repository
        .insert_owner(Owner::new(OwnerId::new(), subject))
        .await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));

    let identity = Arc::new(PostgresIdentityRepository::new(pool.clone()));
    let service = OwnerService::new(Arc::new(repository), identity);
    let resolved = service.create(subject).await;
    assert!(matches!(resolved, Ok(owner) if owner.subject() == subject));
}

#[tokio::test]
async fn profile_primary_group_is_cleared_with_group() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let user_id = UserId::new();
    let group_id = GroupId::new();
    ensure_group(&pool, group_id, &[user_id]).await;
    let profiles = Arc::new(PostgresUserProfileRepository::new(pool.clone()));
    let service = UserProfileService::new(
        profiles.clone(),
        Arc::new(PostgresIdentityRepository::new(pool.clone())),
    );

    let updated = service
        .update_profile(
            user_id,
            UpdateUserProfileInput {
                display_name: Some("Dana".to_owned()),
                primary_group: Some(Some(group_id)),
                ..UpdateUserProfileInput::default()
            },
        )
        .await;
    assert!(updated.is_ok());

    let cleared = profiles.clear_primary_group(group_id).await;
    assert_eq!(cleared.ok(), Some(vec![user_id]));

    let stored = profiles.find_profile(user_id).await;
    let Ok(Some(stored)) = stored else {
        panic!("profile missing after update");
    };
    assert_eq!(stored.display_name.as_deref(), Some("Dana"));
    assert!(stored.primary_group.is_none());
}

#[tokio::test]
async fn owner_name_reads_group_name() {
    let Some(pool) = test_pool().await else {
        return;
    };

    let group_id = GroupId::new();
    ensure_group(&pool, group_id, &[]).await;
    let service = OwnerService::new(
        Arc::new(PostgresOwnerRepository::new(pool.clone())),
        Arc::new(PostgresIdentityRepository::new(pool.clone())),
    );

    let owner = service.create(OwnerSubject::Group(group_id)).await;
    let Ok(owner) = owner else {
        panic!("group owner creation failed");
    };

    let name = service.owner_name(&owner).await;
    assert_eq!(name.ok(), Some(format!("group-{group_id}")));
}

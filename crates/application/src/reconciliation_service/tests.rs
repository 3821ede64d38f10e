use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use rolegate_core::{AppError, GroupId};
use rolegate_domain::{
    ModelPermission, PermissionAction, PermissionGrant, RuleFlags, RuleTable, RulesetName,
    TableName,
};

use crate::test_support::{FakeIdentityRepository, FakePermissionRepository};

use super::GroupPermissionReconciler;

fn permission(table: &str, action: PermissionAction) -> ModelPermission {
    match TableName::new(table) {
        Ok(table) => ModelPermission::new(table, action),
        Err(error) => panic!("invalid table name '{table}': {error}"),
    }
}

async fn reconciler_with(
    repository: Arc<FakePermissionRepository>,
    group_ids: &[GroupId],
) -> GroupPermissionReconciler {
    let identity = Arc::new(FakeIdentityRepository::default());
    for group_id in group_ids {
        identity.add_group(*group_id, &[]).await;
    }

    GroupPermissionReconciler::new(repository, identity, RuleTable::standard())
}

#[tokio::test]
async fn reconcile_creates_default_grant_rows() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;

    let report = reconciler.reconcile(group_id).await;
    assert!(report.is_ok());

    let state = repository.snapshot().await;
    assert_eq!(state.grants.len(), RulesetName::all().len());
    assert!(
        state
            .grants
            .values()
            .all(|grant| grant.flags() == RuleFlags::none())
    );
}

#[tokio::test]
async fn set_flags_update_materializes_ruleset_tables() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;
    let grant = PermissionGrant::new(
        group_id,
        RulesetName::Part,
        RuleFlags {
            can_view: true,
            ..RuleFlags::none()
        },
    );

    let report = reconciler.sync_group(group_id, Some(&grant)).await;
    let Ok(report) = report else {
        panic!("sync failed");
    };

    assert!(report.added.contains(&permission("part_part", PermissionAction::View)));
    assert!(!report.added.contains(&permission("part_part", PermissionAction::Change)));
    assert!(report.removed.is_empty());
}

#[tokio::test]
async fn second_reconcile_performs_no_writes() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;
    let grant = PermissionGrant::new(group_id, RulesetName::Stock, RuleFlags::all());

    assert!(reconciler.sync_group(group_id, Some(&grant)).await.is_ok());
    let writes_after_first = repository.snapshot().await.writes;

    let report = reconciler.reconcile(group_id).await;
    assert!(matches!(report, Ok(ref report) if !report.changed()));
    assert_eq!(repository.snapshot().await.writes, writes_after_first);
}

#[tokio::test]
async fn revoked_flag_removes_permission_not_granted_elsewhere() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;

    let full = PermissionGrant::new(group_id, RulesetName::Build, RuleFlags::all());
    assert!(reconciler.sync_group(group_id, Some(&full)).await.is_ok());

    let view_only = PermissionGrant::new(
        group_id,
        RulesetName::Build,
        RuleFlags {
            can_view: true,
            ..RuleFlags::none()
        },
    );
    let report = reconciler.sync_group(group_id, Some(&view_only)).await;
    let Ok(report) = report else {
        panic!("sync failed");
    };

    assert!(report.removed.contains(&permission("build_build", PermissionAction::Delete)));
    let state = repository.snapshot().await;
    let current = state.permissions.get(&group_id).cloned().unwrap_or_default();
    assert!(current.contains(&permission("build_build", PermissionAction::View)));
    assert!(!current.contains(&permission("build_build", PermissionAction::Change)));
}

#[tokio::test]
async fn shared_table_keeps_permission_granted_by_other_ruleset() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;

    let purchasing = PermissionGrant::new(group_id, RulesetName::PurchaseOrder, RuleFlags::all());
    assert!(reconciler.sync_group(group_id, Some(&purchasing)).await.is_ok());

    let sales_none = PermissionGrant::new(group_id, RulesetName::SalesOrder, RuleFlags::none());
    assert!(reconciler.sync_group(group_id, Some(&sales_none)).await.is_ok());

    let state = repository.snapshot().await;
    let current = state.permissions.get(&group_id).cloned().unwrap_or_default();
    assert!(current.contains(&permission("company_company", PermissionAction::Delete)));
}

#[tokio::test]
async fn parent_change_grants_full_access_to_child_tables() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;
    let grant = PermissionGrant::new(
        group_id,
        RulesetName::Part,
        RuleFlags {
            can_change: true,
            ..RuleFlags::none()
        },
    );

    assert!(reconciler.sync_group(group_id, Some(&grant)).await.is_ok());

    let state = repository.snapshot().await;
    let current = state.permissions.get(&group_id).cloned().unwrap_or_default();
    for action in PermissionAction::all() {
        assert!(current.contains(&permission("part_bomitem", *action)));
        assert!(current.contains(&permission("part_partparameter", *action)));
    }
}

#[tokio::test]
async fn unresolved_permissions_are_reported_and_skipped() {
    let group_id = GroupId::new();
    let missing = permission("part_part", PermissionAction::View);
    let repository = Arc::new(FakePermissionRepository::with_unresolvable(BTreeSet::from([
        missing.clone(),
    ])));
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;
    let grant = PermissionGrant::new(group_id, RulesetName::Part, RuleFlags::all());

    let report = reconciler.sync_group(group_id, Some(&grant)).await;
    let Ok(report) = report else {
        panic!("sync failed");
    };

    assert_eq!(report.unresolved, vec![missing.clone()]);
    assert!(!report.added.contains(&missing));
    assert!(report.added.contains(&permission("part_part", PermissionAction::Add)));
}

#[tokio::test]
async fn permissions_outside_rule_table_are_left_alone() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let foreign = permission("reporting_dashboardwidget", PermissionAction::View);
    repository.insert_permission(group_id, foreign.clone()).await;
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;

    assert!(reconciler.reconcile(group_id).await.is_ok());

    let state = repository.snapshot().await;
    assert!(
        state
            .permissions
            .get(&group_id)
            .is_some_and(|current| current.contains(&foreign))
    );
}

#[tokio::test]
async fn reconcile_unknown_group_is_not_found() {
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(repository, &[]).await;

    let result = reconciler.reconcile(GroupId::new()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn reconcile_all_continues_after_failing_group() {
    let failing = GroupId::new();
    let healthy = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::with_failing_group(failing));
    let reconciler = reconciler_with(Arc::clone(&repository), &[failing, healthy]).await;

    let reports = reconciler.reconcile_all().await;
    let Ok(reports) = reports else {
        panic!("reconcile_all failed");
    };

    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].group_id, healthy);
}

#[tokio::test]
async fn sync_queued_behind_group_deletion_writes_nothing() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let identity = Arc::new(FakeIdentityRepository::default());
    identity.add_group(group_id, &[]).await;
    let reconciler =
        GroupPermissionReconciler::new(repository.clone(), identity.clone(), RuleTable::standard());

    let guard = reconciler.locks.acquire(group_id).await;
    let writer = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move {
            let grant = PermissionGrant::new(group_id, RulesetName::Part, RuleFlags::all());
            reconciler.sync_group(group_id, Some(&grant)).await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!writer.is_finished());

    identity.remove_group(group_id).await;
    drop(guard);
    assert!(reconciler.delete_group(group_id).await.is_ok());

    let written = writer.await;
    assert!(matches!(written, Ok(Err(AppError::NotFound(_)))));
    let state = repository.snapshot().await;
    assert!(state.grants.is_empty());
    assert!(!state.permissions.contains_key(&group_id));
}

#[tokio::test]
async fn delete_group_waits_for_running_sync() {
    let group_id = GroupId::new();
    let repository = Arc::new(FakePermissionRepository::default());
    let reconciler = reconciler_with(Arc::clone(&repository), &[group_id]).await;
    let grant = PermissionGrant::new(group_id, RulesetName::Stock, RuleFlags::all());
    assert!(reconciler.sync_group(group_id, Some(&grant)).await.is_ok());

    let guard = reconciler.locks.acquire(group_id).await;
    let deletion = {
        let reconciler = reconciler.clone();
        tokio::spawn(async move { reconciler.delete_group(group_id).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!deletion.is_finished());
    assert!(!repository.snapshot().await.grants.is_empty());

    drop(guard);
    assert!(matches!(deletion.await, Ok(Ok(()))));
    assert!(repository.snapshot().await.grants.is_empty());
}

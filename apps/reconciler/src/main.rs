//! Rolegate startup reconciliation.
//!
//! Brings the materialized permissions of every group (or of one group) in
//! line with its stored ruleset grants.

#![forbid(unsafe_code)]

use std::env;
use std::sync::Arc;

use rolegate_application::{GroupPermissionReconciler, ReconciliationReport};
use rolegate_core::{AppError, AppResult, GroupId};
use rolegate_domain::{RuleTable, RuleTableOptions};
use rolegate_infrastructure::{PostgresIdentityRepository, PostgresPermissionRepository};

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct ReconcilerConfig {
    database_url: String,
    database_max_connections: u32,
    multi_site: bool,
    group_id: Option<GroupId>,
    register_permission_objects: bool,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ReconcilerConfig::load()?;
    let pool = connect_pool(&config).await?;
    let rule_table = build_rule_table(&config);
    let permission_repository = Arc::new(PostgresPermissionRepository::new(pool.clone()));

    info!(
        multi_site = config.multi_site,
        group_id = ?config.group_id,
        "rolegate-reconciler started"
    );

    if config.register_permission_objects {
        let created = permission_repository
            .register_permissions(&rule_table.permission_universe())
            .await?;
        info!(created, "permission objects registered");
    }

    let reconciler = GroupPermissionReconciler::new(
        permission_repository,
        Arc::new(PostgresIdentityRepository::new(pool)),
        rule_table,
    );

    let reports = match config.group_id {
        Some(group_id) => vec![reconciler.reconcile(group_id).await?],
        None => reconciler.reconcile_all().await?,
    };

    log_summary(&reports);
    Ok(())
}

fn build_rule_table(config: &ReconcilerConfig) -> Arc<RuleTable> {
    if config.multi_site {
        Arc::new(RuleTable::new(RuleTableOptions { multi_site: true }))
    } else {
        RuleTable::standard()
    }
}

fn log_summary(reports: &[ReconciliationReport]) {
    let mut added = 0_usize;
    let mut removed = 0_usize;
    let mut unresolved = 0_usize;

    for report in reports {
        added += report.added.len();
        removed += report.removed.len();
        unresolved += report.unresolved.len();

        if report.changed() || !report.unresolved.is_empty() {
            info!(
                group_id = %report.group_id,
                added = report.added.len(),
                removed = report.removed.len(),
                unresolved = report.unresolved.len(),
                "group reconciled"
            );
        }
    }

    if unresolved > 0 {
        warn!(
            unresolved,
            "some permissions could not be resolved; register them or set REGISTER_PERMISSION_OBJECTS=true"
        );
    }

    info!(
        groups = reports.len(),
        added, removed, unresolved, "reconciliation finished"
    );
}

async fn connect_pool(config: &ReconcilerConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

impl ReconcilerConfig {
    fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let database_max_connections = parse_env_u32("DATABASE_MAX_CONNECTIONS", 5)?;
        let multi_site = parse_env_bool("RULESET_MULTI_SITE", false)?;
        let register_permission_objects = parse_env_bool("REGISTER_PERMISSION_OBJECTS", true)?;
        let group_id = match env::var("RECONCILE_GROUP_ID") {
            Ok(value) if !value.trim().is_empty() => {
                let uuid = uuid::Uuid::parse_str(value.trim()).map_err(|error| {
                    AppError::Validation(format!("invalid RECONCILE_GROUP_ID value '{value}': {error}"))
                })?;
                Some(GroupId::from_uuid(uuid))
            }
            _ => None,
        };

        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            multi_site,
            group_id,
            register_permission_objects,
        })
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(AppError::Validation(format!(
                "invalid {name} value '{value}': expected true or false"
            ))),
        },
        Err(_) => Ok(default),
    }
}

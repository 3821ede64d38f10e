use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};

use crate::ruleset::{ModelPermission, PermissionAction, RulesetName, TableName};

/// Child table that receives every action whenever its parent table grants `change`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InheritanceRule {
    parent_table: TableName,
    child_table: TableName,
}

impl InheritanceRule {
    /// Creates an inheritance pair.
    #[must_use]
    pub fn new(parent_table: TableName, child_table: TableName) -> Self {
        Self {
            parent_table,
            child_table,
        }
    }

    /// Returns the table whose `change` permission is inherited.
    #[must_use]
    pub fn parent_table(&self) -> &TableName {
        &self.parent_table
    }

    /// Returns the table receiving the inherited permissions.
    #[must_use]
    pub fn child_table(&self) -> &TableName {
        &self.child_table
    }
}

/// Options for building a rule table variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuleTableOptions {
    /// Multi-site deployments also govern the `sites_site` table under `admin`.
    pub multi_site: bool,
}

/// Immutable catalog mapping rulesets to governed tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    governed: HashMap<RulesetName, Vec<TableName>>,
    exempt: BTreeSet<TableName>,
    inheritance: Vec<InheritanceRule>,
}

static STANDARD_RULE_TABLE: LazyLock<Arc<RuleTable>> =
    LazyLock::new(|| Arc::new(RuleTable::new(RuleTableOptions::default())));

impl RuleTable {
    /// Builds the rule table for the provided deployment options.
    #[must_use]
    pub fn new(options: RuleTableOptions) -> Self {
        let mut governed: HashMap<RulesetName, Vec<TableName>> = RulesetName::all()
            .iter()
            .map(|ruleset| {
                let tables = governed_table_names(*ruleset)
                    .iter()
                    .map(|name| TableName::from_static(name))
                    .collect();
                (*ruleset, tables)
            })
            .collect();

        if options.multi_site {
            governed
                .entry(RulesetName::Admin)
                .or_default()
                .push(TableName::from_static("sites_site"));
        }

        let exempt = EXEMPT_TABLES
            .iter()
            .map(|name| TableName::from_static(name))
            .collect();

        let inheritance = INHERITANCE_PAIRS
            .iter()
            .map(|(parent, child)| {
                InheritanceRule::new(TableName::from_static(parent), TableName::from_static(child))
            })
            .collect();

        Self {
            governed,
            exempt,
            inheritance,
        }
    }

    /// Returns the shared default rule table.
    #[must_use]
    pub fn standard() -> Arc<Self> {
        Arc::clone(&STANDARD_RULE_TABLE)
    }

    /// Returns the tables governed by a ruleset in declaration order.
    #[must_use]
    pub fn governed_tables(&self, ruleset: RulesetName) -> &[TableName] {
        self.governed
            .get(&ruleset)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns every ruleset governing the table. A table may belong to several.
    #[must_use]
    pub fn rulesets_governing(&self, table: &TableName) -> Vec<RulesetName> {
        RulesetName::all()
            .iter()
            .copied()
            .filter(|ruleset| self.governed_tables(*ruleset).contains(table))
            .collect()
    }

    /// Returns tables that authorize every action without a permission check.
    #[must_use]
    pub fn exempt_tables(&self) -> &BTreeSet<TableName> {
        &self.exempt
    }

    /// Returns whether the table skips permission checks.
    #[must_use]
    pub fn is_exempt(&self, table: &TableName) -> bool {
        self.exempt.contains(table)
    }

    /// Returns the declared parent/child inheritance pairs.
    #[must_use]
    pub fn inheritance_pairs(&self) -> &[InheritanceRule] {
        self.inheritance.as_slice()
    }

    /// Returns every permission a reconciliation pass may add or remove.
    #[must_use]
    pub fn permission_universe(&self) -> BTreeSet<ModelPermission> {
        self.governed
            .values()
            .flatten()
            .flat_map(|table| {
                PermissionAction::all()
                    .iter()
                    .map(|action| ModelPermission::new(table.clone(), *action))
            })
            .collect()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new(RuleTableOptions::default())
    }
}

const INHERITANCE_PAIRS: &[(&str, &str)] = &[
    ("part_part", "part_partparameter"),
    ("part_part", "part_bomitem"),
];

fn governed_table_names(ruleset: RulesetName) -> &'static [&'static str] {
    match ruleset {
        RulesetName::Admin => &[
            "auth_group",
            "auth_user",
            "auth_permission",
            "users_apitoken",
            "users_ruleset",
            "report_labeltemplate",
            "report_reportasset",
            "report_reportsnippet",
            "report_reporttemplate",
            "account_emailaddress",
            "account_emailconfirmation",
            "socialaccount_socialaccount",
            "socialaccount_socialapp",
            "socialaccount_socialtoken",
            "otp_totp_totpdevice",
            "otp_static_statictoken",
            "otp_static_staticdevice",
            "mfa_authenticator",
            "plugin_pluginconfig",
            "plugin_pluginsetting",
            "plugin_notificationusersetting",
            "common_barcodescanresult",
            "common_newsfeedentry",
            "taggit_tag",
            "taggit_taggeditem",
            "flags_flagstate",
            "machine_machineconfig",
            "machine_machinesetting",
        ],
        RulesetName::PartCategory => &[
            "part_partcategory",
            "part_partcategoryparametertemplate",
            "part_partcategorystar",
        ],
        RulesetName::Part => &[
            "part_part",
            "part_partpricing",
            "part_bomitem",
            "part_bomitemsubstitute",
            "part_partsellpricebreak",
            "part_partinternalpricebreak",
            "part_parttesttemplate",
            "part_partparametertemplate",
            "part_partparameter",
            "part_partrelated",
            "part_partstar",
            "part_partcategorystar",
            "company_supplierpart",
            "company_manufacturerpart",
            "company_manufacturerpartparameter",
        ],
        RulesetName::Stocktake => &["part_partstocktake", "part_partstocktakereport"],
        RulesetName::StockLocation => &["stock_stocklocation", "stock_stocklocationtype"],
        RulesetName::Stock => &[
            "stock_stockitem",
            "stock_stockitemtracking",
            "stock_stockitemtestresult",
        ],
        RulesetName::Build => &[
            "part_part",
            "part_partcategory",
            "part_bomitem",
            "part_bomitemsubstitute",
            "build_build",
            "build_builditem",
            "build_buildline",
            "stock_stockitem",
            "stock_stocklocation",
        ],
        RulesetName::PurchaseOrder => &[
            "company_company",
            "company_contact",
            "company_address",
            "company_manufacturerpart",
            "company_manufacturerpartparameter",
            "company_supplierpart",
            "company_supplierpricebreak",
            "order_purchaseorder",
            "order_purchaseorderlineitem",
            "order_purchaseorderextraline",
        ],
        RulesetName::SalesOrder => &[
            "company_company",
            "company_contact",
            "company_address",
            "order_salesorder",
            "order_salesorderallocation",
            "order_salesorderlineitem",
            "order_salesorderextraline",
            "order_salesordershipment",
        ],
        RulesetName::ReturnOrder => &[
            "company_company",
            "company_contact",
            "company_address",
            "order_returnorder",
            "order_returnorderlineitem",
            "order_returnorderextraline",
        ],
    }
}

const EXEMPT_TABLES: &[&str] = &[
    "admin_logentry",
    "contenttypes_contenttype",
    "common_attachment",
    "common_customunit",
    "common_dataoutput",
    "common_inventreesetting",
    "common_inventreeusersetting",
    "common_notificationentry",
    "common_notificationmessage",
    "common_notesimage",
    "common_projectcode",
    "common_webhookendpoint",
    "common_webhookmessage",
    "common_inventreecustomuserstatemodel",
    "common_selectionlistentry",
    "common_selectionlist",
    // Profiles are edited by their own user only.
    "users_owner",
    "users_userprofile",
    "error_report_error",
    "exchange_rate",
    "exchange_exchangebackend",
    "usersessions_usersession",
    "sessions_session",
    "django_q_ormq",
    "django_q_failure",
    "django_q_task",
    "django_q_schedule",
    "django_q_success",
    "importer_dataimportsession",
    "importer_dataimportcolumnmap",
    "importer_dataimportrow",
];

#[cfg(test)]
mod tests {
    use crate::ruleset::{PermissionAction, RulesetName, TableName};

    use super::{EXEMPT_TABLES, INHERITANCE_PAIRS, RuleTable, RuleTableOptions, governed_table_names};

    #[test]
    fn built_in_table_names_are_valid() {
        let governed = RulesetName::all()
            .iter()
            .flat_map(|ruleset| governed_table_names(*ruleset).iter());
        let inherited = INHERITANCE_PAIRS
            .iter()
            .flat_map(|(parent, child)| [parent, child]);

        for name in governed.chain(EXEMPT_TABLES.iter()).chain(inherited) {
            assert!(TableName::new(*name).is_ok(), "invalid table name '{name}'");
        }
    }

    #[test]
    fn exempt_tables_are_not_governed() {
        let rule_table = RuleTable::standard();

        for table in rule_table.exempt_tables() {
            assert!(rule_table.rulesets_governing(table).is_empty());
        }
    }

    #[test]
    fn inheritance_tables_are_governed() {
        let rule_table = RuleTable::standard();

        for rule in rule_table.inheritance_pairs() {
            assert!(!rule_table.rulesets_governing(rule.parent_table()).is_empty());
            assert!(!rule_table.rulesets_governing(rule.child_table()).is_empty());
        }
    }

    #[test]
    fn shared_tables_report_every_governing_ruleset() {
        let rule_table = RuleTable::standard();
        let company = TableName::from_static("company_company");

        assert_eq!(
            rule_table.rulesets_governing(&company),
            vec![
                RulesetName::PurchaseOrder,
                RulesetName::SalesOrder,
                RulesetName::ReturnOrder
            ]
        );
    }

    #[test]
    fn multi_site_adds_site_table_to_admin() {
        let standard = RuleTable::standard();
        let multi_site = RuleTable::new(RuleTableOptions { multi_site: true });
        let sites = TableName::from_static("sites_site");

        assert!(!standard.governed_tables(RulesetName::Admin).contains(&sites));
        assert!(multi_site.governed_tables(RulesetName::Admin).contains(&sites));
    }

    #[test]
    fn permission_universe_covers_every_action() {
        let rule_table = RuleTable::standard();
        let universe = rule_table.permission_universe();
        let stocktake = TableName::from_static("part_partstocktake");

        for action in PermissionAction::all() {
            assert!(
                universe
                    .iter()
                    .any(|permission| permission.table() == &stocktake
                        && permission.action() == *action)
            );
        }
    }
}

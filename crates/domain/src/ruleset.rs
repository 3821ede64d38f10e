use std::fmt::{Display, Formatter};
use std::str::FromStr;

use rolegate_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Coarse permission groups administered per user group.
///
/// Declaration order is significant: reconciliation walks rulesets in this
/// order and listings are returned in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RulesetName {
    /// System administration tables (users, groups, plugins, reports).
    Admin,
    /// Part category tree.
    PartCategory,
    /// Parts, BOMs and supplier parts.
    Part,
    /// Stocktake entries and reports.
    Stocktake,
    /// Stock locations.
    StockLocation,
    /// Stock items and their tracking.
    Stock,
    /// Build orders.
    Build,
    /// Purchase orders and suppliers.
    PurchaseOrder,
    /// Sales orders and customers.
    SalesOrder,
    /// Return orders.
    ReturnOrder,
}

impl RulesetName {
    /// Returns a stable storage value for this ruleset.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::PartCategory => "part_category",
            Self::Part => "part",
            Self::Stocktake => "stocktake",
            Self::StockLocation => "stock_location",
            Self::Stock => "stock",
            Self::Build => "build",
            Self::PurchaseOrder => "purchase_order",
            Self::SalesOrder => "sales_order",
            Self::ReturnOrder => "return_order",
        }
    }

    /// Returns the human-readable label shown in administration views.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::PartCategory => "Part Categories",
            Self::Part => "Parts",
            Self::Stocktake => "Stocktake",
            Self::StockLocation => "Stock Locations",
            Self::Stock => "Stock Items",
            Self::Build => "Build Orders",
            Self::PurchaseOrder => "Purchase Orders",
            Self::SalesOrder => "Sales Orders",
            Self::ReturnOrder => "Return Orders",
        }
    }

    /// Returns all rulesets in declaration order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[RulesetName] = &[
            RulesetName::Admin,
            RulesetName::PartCategory,
            RulesetName::Part,
            RulesetName::Stocktake,
            RulesetName::StockLocation,
            RulesetName::Stock,
            RulesetName::Build,
            RulesetName::PurchaseOrder,
            RulesetName::SalesOrder,
            RulesetName::ReturnOrder,
        ];

        ALL
    }
}

impl Display for RulesetName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for RulesetName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|ruleset| ruleset.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unknown ruleset '{value}'")))
    }
}

/// The closed set of actions a permission can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    /// Read records.
    View,
    /// Create records.
    Add,
    /// Update records.
    Change,
    /// Delete records.
    Delete,
}

impl PermissionAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Add => "add",
            Self::Change => "change",
            Self::Delete => "delete",
        }
    }

    /// Returns all actions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[PermissionAction] = &[
            PermissionAction::View,
            PermissionAction::Add,
            PermissionAction::Change,
            PermissionAction::Delete,
        ];

        ALL
    }
}

impl Display for PermissionAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for PermissionAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "view" => Ok(Self::View),
            "add" => Ok(Self::Add),
            "change" => Ok(Self::Change),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown permission action '{value}'"
            ))),
        }
    }
}

/// Database table identifier in `<app>_<model>` form, e.g. `part_bomitem`.
///
/// The app label may itself contain underscores (`otp_totp_totpdevice`);
/// the model name is always the last segment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    /// Creates a validated table identifier.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();

        let valid_characters = value.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });
        if !valid_characters {
            return Err(AppError::Validation(format!(
                "table name '{value}' must contain only lowercase letters, digits and underscores"
            )));
        }

        if value.starts_with('_') || value.ends_with('_') || !value.contains('_') {
            return Err(AppError::Validation(format!(
                "table name '{value}' must have the form '<app>_<model>'"
            )));
        }

        Ok(Self(value))
    }

    /// Built-in catalog entries. Validity is covered by the rule table tests.
    pub(crate) fn from_static(value: &'static str) -> Self {
        Self(value.to_owned())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the application label (everything before the last underscore).
    #[must_use]
    pub fn app_label(&self) -> &str {
        self.0
            .rsplit_once('_')
            .map(|(app_label, _)| app_label)
            .unwrap_or(self.0.as_str())
    }

    /// Returns the model name (the last underscore-separated segment).
    #[must_use]
    pub fn model_name(&self) -> &str {
        self.0
            .rsplit_once('_')
            .map(|(_, model_name)| model_name)
            .unwrap_or(self.0.as_str())
    }
}

impl Display for TableName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<String> for TableName {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(value: TableName) -> Self {
        value.0
    }
}

impl FromStr for TableName {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

/// One materialized permission: an action on a table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelPermission {
    table: TableName,
    action: PermissionAction,
}

impl ModelPermission {
    /// Creates a permission for an action on a table.
    #[must_use]
    pub fn new(table: TableName, action: PermissionAction) -> Self {
        Self { table, action }
    }

    /// Returns the governed table.
    #[must_use]
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Returns the granted action.
    #[must_use]
    pub fn action(&self) -> PermissionAction {
        self.action
    }

    /// Returns the permission codename, e.g. `change_bomitem`.
    #[must_use]
    pub fn codename(&self) -> String {
        format!("{}_{}", self.action.as_str(), self.table.model_name())
    }

    /// Returns the natural key, e.g. `part.change_bomitem`. Used for diagnostics.
    #[must_use]
    pub fn natural_key(&self) -> String {
        format!("{}.{}", self.table.app_label(), self.codename())
    }
}

impl Display for ModelPermission {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.natural_key().as_str())
    }
}

use std::str::FromStr;

use rolegate_core::{AppError, GroupId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a user account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    /// Automated account.
    Bot,
    /// Staff member.
    #[default]
    Internal,
    /// External collaborator.
    External,
    /// Guest account.
    Guest,
}

impl UserType {
    /// Returns a stable storage value for the user type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Internal => "internal",
            Self::External => "external",
            Self::Guest => "guest",
        }
    }
}

impl FromStr for UserType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bot" => Ok(Self::Bot),
            "internal" => Ok(Self::Internal),
            "external" => Ok(Self::External),
            "guest" => Ok(Self::Guest),
            _ => Err(AppError::Validation(format!("unknown user type '{value}'"))),
        }
    }
}

/// Informational per-user attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Profile owner.
    pub user_id: UserId,
    /// Chosen display name.
    pub display_name: Option<String>,
    /// Main job title or position.
    pub position: Option<String>,
    /// Preferred language code.
    pub language: Option<String>,
    /// Free-form status message.
    pub status: Option<String>,
    /// Location information.
    pub location: Option<String>,
    /// Preferred contact information.
    pub contact: Option<String>,
    /// Primary organisation or affiliation.
    pub organisation: Option<String>,
    /// Whether the user is actively using the system.
    pub active: bool,
    /// Account classification.
    pub user_type: UserType,
    /// Primary group; must be one of the user's groups.
    pub primary_group: Option<GroupId>,
    /// Opaque UI theme settings.
    pub theme: Option<Value>,
    /// Opaque dashboard widget settings.
    pub widgets: Option<Value>,
}

impl UserProfile {
    /// Creates the default profile for a new user.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
            position: None,
            language: None,
            status: None,
            location: None,
            contact: None,
            organisation: None,
            active: true,
            user_type: UserType::default(),
            primary_group: None,
            theme: None,
            widgets: None,
        }
    }

    /// Clears the primary group when it is not among `memberships`.
    ///
    /// Returns `true` when the profile changed.
    pub fn retain_valid_primary_group(&mut self, memberships: &[GroupId]) -> bool {
        match self.primary_group {
            Some(group_id) if !memberships.contains(&group_id) => {
                self.primary_group = None;
                true
            }
            _ => false,
        }
    }
}

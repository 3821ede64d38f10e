use std::fmt::{Display, Formatter};
use std::str::FromStr;

pub use rolegate_core::OwnerId;
use rolegate_core::{AppError, GroupId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of authorization subject behind an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    /// An individual user.
    User,
    /// A user group.
    Group,
}

impl OwnerKind {
    /// Returns a stable storage value for the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Group => "group",
        }
    }
}

impl FromStr for OwnerKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "group" => Ok(Self::Group),
            _ => Err(AppError::Validation(format!("unknown owner kind '{value}'"))),
        }
    }
}

/// The user or group an owner stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerSubject {
    /// Owner bound to a user.
    User(UserId),
    /// Owner bound to a group.
    Group(GroupId),
}

impl OwnerSubject {
    /// Returns the subject kind.
    #[must_use]
    pub fn kind(&self) -> OwnerKind {
        match self {
            Self::User(_) => OwnerKind::User,
            Self::Group(_) => OwnerKind::Group,
        }
    }

    /// Returns the raw subject identifier.
    #[must_use]
    pub fn subject_uuid(&self) -> Uuid {
        match self {
            Self::User(user_id) => user_id.as_uuid(),
            Self::Group(group_id) => group_id.as_uuid(),
        }
    }

    /// Rebuilds a subject from its stored kind and identifier.
    #[must_use]
    pub fn from_parts(kind: OwnerKind, subject_id: Uuid) -> Self {
        match kind {
            OwnerKind::User => Self::User(UserId::from_uuid(subject_id)),
            OwnerKind::Group => Self::Group(GroupId::from_uuid(subject_id)),
        }
    }
}

impl Display for OwnerSubject {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}", self.kind().as_str(), self.subject_uuid())
    }
}

/// Uniform handle over a user or group used for record ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    owner_id: OwnerId,
    subject: OwnerSubject,
}

impl Owner {
    /// Creates an owner record.
    #[must_use]
    pub fn new(owner_id: OwnerId, subject: OwnerSubject) -> Self {
        Self { owner_id, subject }
    }

    /// Returns the owner identifier.
    #[must_use]
    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    /// Returns the bound subject.
    #[must_use]
    pub fn subject(&self) -> OwnerSubject {
        self.subject
    }

    /// Returns the subject kind.
    #[must_use]
    pub fn kind(&self) -> OwnerKind {
        self.subject.kind()
    }

    /// Returns the type label, `user` or `group`.
    #[must_use]
    pub fn label(&self) -> &'static str {
        self.kind().as_str()
    }
}

use serde::{Deserialize, Serialize};

use crate::UserId;

/// Authenticated caller as supplied by the identity collaborator.
///
/// Credential validation happens outside this workspace; holding a
/// `UserIdentity` means the caller is authenticated as `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    user_id: UserId,
    username: String,
    is_superuser: bool,
}

impl UserIdentity {
    /// Creates a regular user identity.
    #[must_use]
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_superuser: false,
        }
    }

    /// Creates a superuser identity. Superusers bypass every permission check.
    #[must_use]
    pub fn superuser(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_superuser: true,
        }
    }

    /// Returns the stable user identifier.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the login name of the user.
    #[must_use]
    pub fn username(&self) -> &str {
        self.username.as_str()
    }

    /// Returns whether the identity bypasses permission checks.
    #[must_use]
    pub fn is_superuser(&self) -> bool {
        self.is_superuser
    }
}

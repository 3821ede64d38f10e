//! API token display and activity contract.
//!
//! Issuing and validating tokens belongs to the authentication layer; this
//! module only fixes how a token key is generated, redacted and aged.

use std::fmt::{Debug, Display, Formatter, Write};

use chrono::{Days, NaiveDate};
use rolegate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix prepended to generated token keys.
pub const API_TOKEN_PREFIX: &str = "rg-";

/// Minimum accepted key length.
pub const API_TOKEN_MIN_LENGTH: usize = 50;

/// Maximum accepted key length.
pub const API_TOKEN_MAX_LENGTH: usize = 100;

/// Maximum token name length after sanitizing.
pub const API_TOKEN_NAME_MAX_LENGTH: usize = 100;

/// Validity of a newly issued token.
pub const API_TOKEN_DEFAULT_VALIDITY_DAYS: u64 = 365;

const REDACTED_PREFIX_LENGTH: usize = 8;
const REDACTED_SUFFIX_LENGTH: usize = 12;

/// Persisted API token. The raw key is never rendered through `Display` or `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiToken {
    token_id: Uuid,
    user_id: UserId,
    key: String,
    name: String,
    expiry: NaiveDate,
    last_seen: Option<NaiveDate>,
    revoked: bool,
}

/// Freshly issued token together with its raw secret, shown exactly once.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedApiToken {
    /// The stored token.
    pub token: ApiToken,
    /// The raw key to hand to the caller.
    pub raw_key: String,
}

impl ApiToken {
    /// Creates a token from stored values, validating the key.
    pub fn new(
        token_id: Uuid,
        user_id: UserId,
        key: impl Into<String>,
        name: &str,
        expiry: NaiveDate,
    ) -> AppResult<Self> {
        let key = key.into();
        let length = key.len();

        if !key.chars().all(|character| character.is_ascii_graphic()) {
            return Err(AppError::Validation(
                "api token key must contain printable ASCII characters only".to_owned(),
            ));
        }

        if !(API_TOKEN_MIN_LENGTH..=API_TOKEN_MAX_LENGTH).contains(&length) {
            return Err(AppError::Validation(format!(
                "api token key must be between {API_TOKEN_MIN_LENGTH} and {API_TOKEN_MAX_LENGTH} characters"
            )));
        }

        Ok(Self {
            token_id,
            user_id,
            key,
            name: sanitize_name(name),
            expiry,
            last_seen: None,
            revoked: false,
        })
    }

    /// Issues a new token with a generated key.
    ///
    /// Without an explicit expiry the token is valid for one year from `today`.
    pub fn issue(
        user_id: UserId,
        name: &str,
        expiry: Option<NaiveDate>,
        today: NaiveDate,
    ) -> AppResult<IssuedApiToken> {
        let key = generate_key(API_TOKEN_PREFIX, today)?;
        let expiry = match expiry {
            Some(expiry) => expiry,
            None => default_expiry(today)?,
        };
        let token = Self::new(Uuid::new_v4(), user_id, key.clone(), name, expiry)?;

        Ok(IssuedApiToken {
            token,
            raw_key: key,
        })
    }

    /// Returns the token identifier.
    #[must_use]
    pub fn token_id(&self) -> Uuid {
        self.token_id
    }

    /// Returns the owning user.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the sanitized token name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Returns the expiry date.
    #[must_use]
    pub fn expiry(&self) -> NaiveDate {
        self.expiry
    }

    /// Returns the last day the token was used.
    #[must_use]
    pub fn last_seen(&self) -> Option<NaiveDate> {
        self.last_seen
    }

    /// Returns whether the token was revoked.
    #[must_use]
    pub fn revoked(&self) -> bool {
        self.revoked
    }

    /// Returns whether the raw key matches this token.
    #[must_use]
    pub fn matches_key(&self, raw_key: &str) -> bool {
        self.key == raw_key
    }

    /// Returns the display form: fixed prefix, masked middle, fixed suffix.
    #[must_use]
    pub fn redacted(&self) -> String {
        redact_key(self.key.as_str())
    }

    /// Returns whether the expiry date lies before `today`.
    #[must_use]
    pub fn expired(&self, today: NaiveDate) -> bool {
        self.expiry < today
    }

    /// Returns whether the token is neither revoked nor expired.
    #[must_use]
    pub fn active(&self, today: NaiveDate) -> bool {
        !self.revoked && !self.expired(today)
    }

    /// Marks the token as revoked.
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    /// Records usage of the token.
    pub fn touch(&mut self, today: NaiveDate) {
        self.last_seen = Some(today);
    }
}

impl Display for ApiToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.redacted().as_str())
    }
}

impl Debug for ApiToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ApiToken")
            .field("token_id", &self.token_id)
            .field("user_id", &self.user_id)
            .field("key", &self.redacted())
            .field("name", &self.name)
            .field("expiry", &self.expiry)
            .field("last_seen", &self.last_seen)
            .field("revoked", &self.revoked)
            .finish()
    }
}

impl Debug for IssuedApiToken {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("IssuedApiToken")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

/// Masks everything but the first 8 and last 12 characters of a key.
#[must_use]
pub fn redact_key(key: &str) -> String {
    let characters: Vec<char> = key.chars().collect();
    let length = characters.len();
    if length <= REDACTED_PREFIX_LENGTH + REDACTED_SUFFIX_LENGTH {
        return "*".repeat(length);
    }

    let masked = length - REDACTED_PREFIX_LENGTH - REDACTED_SUFFIX_LENGTH;
    let mut redacted = String::with_capacity(length);
    redacted.extend(&characters[..REDACTED_PREFIX_LENGTH]);
    redacted.push_str("*".repeat(masked).as_str());
    redacted.extend(&characters[length - REDACTED_SUFFIX_LENGTH..]);
    redacted
}

/// Generates `<prefix><40 hex chars>-<YYYYMMDD>`.
pub fn generate_key(prefix: &str, today: NaiveDate) -> AppResult<String> {
    let mut bytes = [0u8; 20];
    getrandom::fill(&mut bytes)
        .map_err(|error| AppError::Internal(format!("failed to generate api token: {error}")))?;

    let mut key = String::with_capacity(prefix.len() + 49);
    key.push_str(prefix);
    for byte in bytes {
        let _ = write!(key, "{byte:02x}");
    }
    let _ = write!(key, "-{}", today.format("%Y%m%d"));

    Ok(key)
}

/// Returns the default expiry for a token issued on `today`.
pub fn default_expiry(today: NaiveDate) -> AppResult<NaiveDate> {
    today
        .checked_add_days(Days::new(API_TOKEN_DEFAULT_VALIDITY_DAYS))
        .ok_or_else(|| AppError::Validation("token expiry is out of range".to_owned()))
}

/// Normalizes a user-provided token name.
///
/// Strips control characters and markup tags, replaces spaces with dashes
/// and truncates to [`API_TOKEN_NAME_MAX_LENGTH`] characters.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut without_tags = String::with_capacity(name.len());
    let mut inside_tag = false;
    for character in name.trim().chars() {
        match character {
            '<' => inside_tag = true,
            '>' if inside_tag => inside_tag = false,
            _ if inside_tag || character.is_control() => {}
            _ => without_tags.push(character),
        }
    }

    without_tags
        .trim()
        .replace(' ', "-")
        .chars()
        .take(API_TOKEN_NAME_MAX_LENGTH)
        .collect()
}

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::errors::EmailError;
use crate::domain::errors::UserIdError;

/// User aggregate entity.
///
/// Credentials live outside the aggregate (see `CredentialRepository`), so a
/// user created by magic link or OAuth simply has no password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: EmailAddress,
    pub auth_method: AuthMethod,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh, not yet persisted user.
    pub fn new(email: EmailAddress, auth_method: AuthMethod, is_verified: bool) -> Self {
        Self {
            id: UserId::new(),
            email,
            auth_method,
            is_verified,
            created_at: Utc::now(),
        }
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    ///
    /// # Returns
    /// UserId with random UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Normalized email address.
///
/// Every lookup and uniqueness check goes through this type, so two spellings
/// of one mailbox always compare equal. Normalization trims, lowercases, and
/// for Gmail drops local-part dots and folds `googlemail.com` into `gmail.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    const GMAIL_DOMAINS: [&'static str; 2] = ["gmail.com", "googlemail.com"];

    /// Normalize and validate a raw email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: &str) -> Result<Self, EmailError> {
        let trimmed = email.trim().to_lowercase();

        let normalized = match trimmed.rsplit_once('@') {
            Some((local, domain)) if Self::GMAIL_DOMAINS.contains(&domain) => {
                format!("{}@gmail.com", local.replace('.', ""))
            }
            _ => trimmed,
        };

        // Checked after canonicalizing so every stored address parses again
        email_address::EmailAddress::from_str(&normalized)
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))?;

        Ok(Self(normalized))
    }

    /// Get email as string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EmailAddress {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

/// How a user originally signed up.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthMethod {
    Password,
    MagicLink,
    OAuth(String),
}

impl AuthMethod {
    /// Auth method for users created through an OAuth provider.
    pub fn oauth(provider_id: &str) -> Self {
        AuthMethod::OAuth(provider_id.to_lowercase())
    }

    /// Stable storage representation (`password`, `magic_link`, `oauth_<provider>`).
    pub fn as_string(&self) -> String {
        match self {
            AuthMethod::Password => "password".to_string(),
            AuthMethod::MagicLink => "magic_link".to_string(),
            AuthMethod::OAuth(provider) => format!("oauth_{}", provider),
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "password" => Ok(AuthMethod::Password),
            "magic_link" => Ok(AuthMethod::MagicLink),
            other => match other.strip_prefix("oauth_") {
                Some(provider) if !provider.is_empty() => Ok(AuthMethod::oauth(provider)),
                _ => Err(format!("Unknown auth method: {}", other)),
            },
        }
    }
}

/// A committed change to a user's credentials or identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub user_id: UserId,
    pub change: AccountChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountChange {
    Password,
    Email {
        old: EmailAddress,
        new: EmailAddress,
    },
}

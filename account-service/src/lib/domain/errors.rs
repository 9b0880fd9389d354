use thiserror::Error;

/// Error for UserId parsing failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserIdError {
    #[error("Invalid UUID format: {0}")]
    InvalidFormat(String),
}

/// Error for EmailAddress validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmailError {
    #[error("Invalid email format: {0}")]
    InvalidFormat(String),
}

/// Password strength policy violations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PasswordPolicyError {
    #[error("Password too short: minimum {min} characters, got {actual}")]
    TooShort { min: usize, actual: usize },

    #[error("Password too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },

    #[error("Password must mix at least {required} character classes, got {actual}")]
    TooFewCharacterClasses { required: usize, actual: usize },

    #[error("Password is too common")]
    Common,
}

/// Failures reported by an OAuth provider adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Authorization code rejected: {0}")]
    InvalidCode(String),

    #[error("Provider request failed: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    UnexpectedResponse(String),
}

/// Top-level error for every account operation.
///
/// `InvalidCredentials`, `TokenInvalid` and `TokenExpired` are deliberately
/// coarse. Callers should map them to uniform user-facing messages.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccountError {
    // Input validation
    #[error("Invalid user ID: {0}")]
    InvalidUserId(#[from] UserIdError),

    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Weak password: {0}")]
    WeakPassword(#[from] PasswordPolicyError),

    // Not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    // Conflicts
    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Provider account is already linked to another user")]
    ProviderLinked,

    #[error("New email is the same as the current email")]
    EmailUnchanged,

    // Credentials
    #[error("Invalid credentials")]
    InvalidCredentials,

    // Signed tokens
    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    // OAuth flow
    #[error("Invalid or expired OAuth state")]
    InvalidState,

    #[error("Invalid OAuth authorization code")]
    InvalidCode,

    #[error("Provider did not verify the email address")]
    UnverifiedEmail,

    #[error("Email is already registered with another sign-in method")]
    ProviderEmailInUse,

    #[error("No linked account for this provider")]
    NoProviderLink,

    // Hooks
    #[error("{operation} blocked: {reason}")]
    Blocked {
        operation: &'static str,
        reason: String,
    },

    // Infrastructure
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("OAuth provider error: {0}")]
    Provider(String),
}

impl AccountError {
    /// Prefix a storage error with the operation that produced it.
    ///
    /// Domain errors (conflicts, not-found, ...) pass through untouched so
    /// their kind survives the trip up to the caller.
    pub fn context(self, operation: &str) -> Self {
        match self {
            AccountError::Storage(message) => {
                AccountError::Storage(format!("{}: {}", operation, message))
            }
            other => other,
        }
    }

    /// Whether the error came from the storage layer.
    pub fn is_storage(&self) -> bool {
        matches!(self, AccountError::Storage(_))
    }
}

impl From<ProviderError> for AccountError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::InvalidCode(_) => AccountError::InvalidCode,
            other => AccountError::Provider(other.to_string()),
        }
    }
}

impl From<config::ConfigError> for AccountError {
    fn from(err: config::ConfigError) -> Self {
        AccountError::Config(err.to_string())
    }
}

impl From<auth::PasswordError> for AccountError {
    fn from(err: auth::PasswordError) -> Self {
        AccountError::Hashing(err.to_string())
    }
}

//! Signed token payloads.
//!
//! These shapes are the wire contract between issuing a token and verifying
//! it. Each embeds a Subject discriminator (`sub`) and an absolute expiry
//! (`exp`, Unix seconds) next to its flow-specific fields.

use auth::TokenError;
use auth::TokenSigner;
use chrono::DateTime;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::errors::AccountError;

pub const PASSWORD_RESET_SUBJECT: &str = "password-reset";
pub const MAGIC_LINK_SUBJECT: &str = "magic-link";
pub const EMAIL_CHANGE_SUBJECT: &str = "email-change";

/// Common surface of every signed token payload.
pub trait TokenClaims: Serialize + DeserializeOwned {
    /// Subject discriminator this payload type must carry.
    const SUBJECT: &'static str;

    fn subject(&self) -> &str;

    /// Expiry as Unix seconds.
    fn expires_at(&self) -> i64;

    /// Expired once the clock has moved past `exp`.
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.expires_at()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetClaims {
    pub sub: String,
    pub user_id: String,
    pub email: String,
    pub exp: i64,
}

impl PasswordResetClaims {
    pub fn new(user_id: String, email: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: PASSWORD_RESET_SUBJECT.to_string(),
            user_id,
            email,
            exp: expires_at.timestamp(),
        }
    }
}

impl TokenClaims for PasswordResetClaims {
    const SUBJECT: &'static str = PASSWORD_RESET_SUBJECT;

    fn subject(&self) -> &str {
        &self.sub
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Magic-link payload. `jti` identifies the token for single-use tracking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLinkClaims {
    pub sub: String,
    pub jti: String,
    pub email: String,
    pub exp: i64,
}

impl MagicLinkClaims {
    pub fn new(token_id: String, email: String, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: MAGIC_LINK_SUBJECT.to_string(),
            jti: token_id,
            email,
            exp: expires_at.timestamp(),
        }
    }
}

impl TokenClaims for MagicLinkClaims {
    const SUBJECT: &'static str = MAGIC_LINK_SUBJECT;

    fn subject(&self) -> &str {
        &self.sub
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailChangeClaims {
    pub sub: String,
    pub user_id: String,
    pub old_email: String,
    pub new_email: String,
    pub exp: i64,
}

impl EmailChangeClaims {
    pub fn new(
        user_id: String,
        old_email: String,
        new_email: String,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: EMAIL_CHANGE_SUBJECT.to_string(),
            user_id,
            old_email,
            new_email,
            exp: expires_at.timestamp(),
        }
    }
}

impl TokenClaims for EmailChangeClaims {
    const SUBJECT: &'static str = EMAIL_CHANGE_SUBJECT;

    fn subject(&self) -> &str {
        &self.sub
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }
}

/// Sign a payload, mapping signer failures into the account taxonomy.
pub fn issue<T: TokenClaims>(signer: &TokenSigner, claims: &T) -> Result<String, AccountError> {
    signer
        .sign(claims)
        .map_err(|e| AccountError::Signing(e.to_string()))
}

/// Verify signature, then Subject, then expiry.
///
/// # Errors
/// * `TokenInvalid` - Bad signature, malformed token, or wrong Subject
/// * `TokenExpired` - Signature and Subject are fine but `exp` has passed
pub fn verify<T: TokenClaims>(
    signer: &TokenSigner,
    token: &str,
    now: DateTime<Utc>,
) -> Result<T, AccountError> {
    let claims: T = signer.verify(token).map_err(|e| match e {
        TokenError::SignatureMismatch | TokenError::Malformed(_) => AccountError::TokenInvalid,
        TokenError::SigningFailed(message) => AccountError::Signing(message),
    })?;

    if claims.subject() != T::SUBJECT {
        return Err(AccountError::TokenInvalid);
    }

    if claims.is_expired(now) {
        return Err(AccountError::TokenExpired);
    }

    Ok(claims)
}

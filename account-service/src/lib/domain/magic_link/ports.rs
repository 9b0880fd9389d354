use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::errors::AccountError;
use crate::domain::user::models::User;
use crate::domain::user::ports::UserRepository;

/// Port for passwordless email login.
#[async_trait]
pub trait MagicLinkPort: Send + Sync + 'static {
    /// Issue a magic link, creating an unverified user on first contact.
    ///
    /// # Errors
    /// * `InvalidEmail` - Email is malformed
    /// * `Storage` - Storage operation failed
    async fn request_magic_link(&self, email: &str) -> Result<MagicLink, AccountError>;

    /// Redeem a magic link.
    ///
    /// # Errors
    /// * `TokenInvalid` - Bad signature, wrong Subject, or link already used
    /// * `TokenExpired` - Link is past its expiry
    /// * `UserNotFound` - User was removed after the link was issued
    /// * `Blocked` - The before-verify hook vetoed the login
    async fn verify_magic_link(&self, token: &str) -> Result<User, AccountError>;
}

/// Issued magic link, ready to be delivered by email.
#[derive(Debug, Clone)]
pub struct MagicLink {
    pub token: String,
    pub token_id: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

/// Single-use tracking for magic-link tokens.
#[async_trait]
pub trait MagicLinkRepository: Send + Sync + 'static {
    /// Record the token id as used.
    ///
    /// Returns `true` on first use and `false` on every later call, atomically.
    /// `expires_at` lets the store forget ids once the token could no longer
    /// verify anyway.
    async fn consume_token_id(
        &self,
        token_id: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AccountError>;
}

/// Storage capabilities the magic-link authenticator needs.
pub trait MagicLinkStore: UserRepository + MagicLinkRepository {}

impl<T> MagicLinkStore for T where T: UserRepository + MagicLinkRepository {}

use async_trait::async_trait;

use super::models::AuthorizationRequest;
use super::models::OAuthLink;
use super::models::OAuthOutcome;
use super::models::OAuthState;
use super::models::ProviderProfile;
use crate::domain::errors::AccountError;
use crate::domain::errors::ProviderError;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::UserRepository;

/// Port for the provider-agnostic OAuth authenticator.
#[async_trait]
pub trait OAuthPort: Send + Sync + 'static {
    /// Identifier of the configured provider (`google`, `github`, ...).
    fn provider_id(&self) -> &str;

    /// Issue a fresh CSRF state and the provider's authorization URL.
    ///
    /// # Errors
    /// * `Storage` - State could not be persisted
    async fn get_auth_url(&self) -> Result<AuthorizationRequest, AccountError>;

    /// Complete the callback: log in, sign up, or link to `link_to`.
    ///
    /// # Errors
    /// * `InvalidState` - Unknown, consumed or expired state
    /// * `InvalidCode` - Provider rejected the authorization code
    /// * `UnverifiedEmail` - Provider did not verify the email and policy requires it
    /// * `ProviderLinked` - Provider identity belongs to a different user
    /// * `ProviderEmailInUse` - Email already registered, refusing implicit takeover
    /// * `Provider` - Network or protocol failure talking to the provider
    async fn auth(
        &self,
        code: &str,
        state: &str,
        link_to: Option<&UserId>,
    ) -> Result<OAuthOutcome, AccountError>;

    /// Remove this provider's link from a user.
    ///
    /// # Errors
    /// * `NoProviderLink` - User has no link for this provider
    async fn unlink(&self, user_id: &UserId) -> Result<(), AccountError>;
}

/// One OAuth2 provider behind a normalized contract.
#[async_trait]
pub trait ProviderAdapter: Send + Sync + 'static {
    fn provider_id(&self) -> &str;

    /// Authorization URL embedding the given CSRF state.
    fn auth_url(&self, state: &str) -> String;

    /// Exchange the authorization code and fetch the user's profile.
    async fn resolve_profile(&self, code: &str) -> Result<ProviderProfile, ProviderError>;
}

/// Persistence for provider links.
#[async_trait]
pub trait OAuthLinkRepository: Send + Sync + 'static {
    /// Reverse lookup by provider identity.
    async fn find_link(
        &self,
        provider: &str,
        provider_user_id: &str,
    ) -> Result<Option<OAuthLink>, AccountError>;

    async fn find_link_for_user(
        &self,
        user_id: &UserId,
        provider: &str,
    ) -> Result<Option<OAuthLink>, AccountError>;

    /// Persist a link.
    ///
    /// # Errors
    /// * `ProviderLinked` - Provider identity is already linked
    /// * `Storage` - Storage operation failed
    async fn create_link(&self, link: OAuthLink) -> Result<OAuthLink, AccountError>;

    /// Remove a user's link for a provider. Returns whether a link existed.
    async fn delete_link(&self, user_id: &UserId, provider: &str) -> Result<bool, AccountError>;
}

/// One-time CSRF state storage.
#[async_trait]
pub trait OAuthStateRepository: Send + Sync + 'static {
    async fn store_state(&self, state: OAuthState) -> Result<(), AccountError>;

    /// Atomically remove and return a state.
    ///
    /// Concurrent calls with the same value must see at most one `Some`.
    async fn consume_state(&self, state: &str) -> Result<Option<OAuthState>, AccountError>;
}

/// Storage capabilities the OAuth authenticator needs.
pub trait OAuthStore: UserRepository + OAuthLinkRepository + OAuthStateRepository {}

impl<T> OAuthStore for T where T: UserRepository + OAuthLinkRepository + OAuthStateRepository {}

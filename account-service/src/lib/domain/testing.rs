//! Shared mocks for service unit tests.

use async_trait::async_trait;
use auth::HashingParams;
use auth::PasswordHasher;
use auth::TokenSigner;
use chrono::DateTime;
use chrono::Utc;
use mockall::mock;

use crate::domain::errors::AccountError;
use crate::domain::errors::ProviderError;
use crate::domain::magic_link::ports::MagicLinkRepository;
use crate::domain::oauth::models::OAuthLink;
use crate::domain::oauth::models::OAuthState;
use crate::domain::oauth::models::ProviderProfile;
use crate::domain::oauth::ports::OAuthLinkRepository;
use crate::domain::oauth::ports::OAuthStateRepository;
use crate::domain::oauth::ports::ProviderAdapter;
use crate::domain::user::models::AuthMethod;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::CredentialRepository;
use crate::domain::user::ports::UserRepository;

pub const TEST_SECRET: &[u8] = b"test_secret_key_at_least_32_bytes!";

mock! {
    pub Store {}

    #[async_trait]
    impl UserRepository for Store {
        async fn create(&self, user: User) -> Result<User, AccountError>;
        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AccountError>;
        async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, AccountError>;
        async fn mark_verified(&self, id: &UserId) -> Result<User, AccountError>;
        async fn change_email(
            &self,
            id: &UserId,
            current: &EmailAddress,
            new: &EmailAddress,
        ) -> Result<Option<User>, AccountError>;
        async fn delete(&self, id: &UserId) -> Result<(), AccountError>;
    }

    #[async_trait]
    impl CredentialRepository for Store {
        async fn get_password_hash(&self, user_id: &UserId) -> Result<Option<String>, AccountError>;
        async fn set_password_hash(&self, user_id: &UserId, hash: &str) -> Result<(), AccountError>;
    }

    #[async_trait]
    impl MagicLinkRepository for Store {
        async fn consume_token_id(
            &self,
            token_id: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<bool, AccountError>;
    }

    #[async_trait]
    impl OAuthLinkRepository for Store {
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
        async fn create_link(&self, link: OAuthLink) -> Result<OAuthLink, AccountError>;
        async fn delete_link(&self, user_id: &UserId, provider: &str) -> Result<bool, AccountError>;
    }

    #[async_trait]
    impl OAuthStateRepository for Store {
        async fn store_state(&self, state: OAuthState) -> Result<(), AccountError>;
        async fn consume_state(&self, state: &str) -> Result<Option<OAuthState>, AccountError>;
    }
}

/// Provider adapter returning a canned profile.
pub struct StubProvider {
    pub id: String,
    pub profile: Result<ProviderProfile, ProviderError>,
}

impl StubProvider {
    pub fn new(id: &str, profile: ProviderProfile) -> Self {
        Self {
            id: id.to_string(),
            profile: Ok(profile),
        }
    }

    pub fn failing(id: &str, error: ProviderError) -> Self {
        Self {
            id: id.to_string(),
            profile: Err(error),
        }
    }
}

#[async_trait]
impl ProviderAdapter for StubProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn auth_url(&self, state: &str) -> String {
        format!("https://provider.test/authorize?state={}", state)
    }

    async fn resolve_profile(&self, _code: &str) -> Result<ProviderProfile, ProviderError> {
        self.profile.clone()
    }
}

pub fn profile(provider_user_id: &str, email: &str, email_verified: bool) -> ProviderProfile {
    ProviderProfile {
        provider_user_id: provider_user_id.to_string(),
        email: email.to_string(),
        email_verified,
        display_name: Some("Test User".to_string()),
        avatar_url: None,
    }
}

pub fn signer() -> TokenSigner {
    TokenSigner::new(TEST_SECRET)
}

/// Argon2 with minimal work factors so tests stay fast.
pub fn fast_hasher() -> PasswordHasher {
    PasswordHasher::with_params(HashingParams {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test params")
}

pub fn user(email: &str, auth_method: AuthMethod) -> User {
    User::new(EmailAddress::new(email).unwrap(), auth_method, false)
}

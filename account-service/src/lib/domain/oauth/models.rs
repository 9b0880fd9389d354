use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Association between a user and an identity at an OAuth provider.
///
/// A `(provider, provider_user_id)` pair maps to at most one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthLink {
    pub user_id: UserId,
    pub provider: String,
    pub provider_user_id: String,
    pub created_at: DateTime<Utc>,
}

impl OAuthLink {
    pub fn new(user_id: UserId, provider: &str, provider_user_id: &str) -> Self {
        Self {
            user_id,
            provider: provider.to_string(),
            provider_user_id: provider_user_id.to_string(),
            created_at: Utc::now(),
        }
    }
}

/// Single-use CSRF token bound to one authorization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub state: String,
    pub expires_at: DateTime<Utc>,
}

impl OAuthState {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Normalized profile every provider adapter produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub provider_user_id: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// Authorization URL handed to the browser, with the state it embeds.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a completed OAuth callback.
#[derive(Debug, Clone)]
pub struct OAuthOutcome {
    pub user: User,
    pub profile: ProviderProfile,
    /// A user record was created by this callback.
    pub created: bool,
    /// The callback linked the provider to an existing user.
    pub linked: bool,
}

/// Argument of the before-link hook.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub user_id: UserId,
    pub provider: String,
    pub profile: ProviderProfile,
}

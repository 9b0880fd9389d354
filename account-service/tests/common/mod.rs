#![allow(dead_code)]

use std::sync::Arc;
use std::sync::Once;

use account_service::config::AccountConfig;
use account_service::config::HashingConfig;
use account_service::domain::errors::ProviderError;
use account_service::domain::oauth::models::ProviderProfile;
use account_service::domain::oauth::ports::ProviderAdapter;
use account_service::domain::oauth::service::OAuthAuthenticator;
use account_service::outbound::repositories::InMemoryAccountStore;
use account_service::services;
use account_service::AccountServices;
use async_trait::async_trait;
use auth::TokenSigner;

pub const TEST_SECRET: &str = "integration_test_secret_32_bytes!!";

static TRACING: Once = Once::new();

/// Route service logs to the test harness. `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "account_service=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn test_config() -> AccountConfig {
    let mut config = AccountConfig::with_secret(TEST_SECRET);
    config.hashing = HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    };
    config
}

/// Services over a fresh in-memory store
pub struct TestApp {
    pub store: Arc<InMemoryAccountStore>,
    pub services: AccountServices<InMemoryAccountStore>,
    pub config: AccountConfig,
    pub signer: TokenSigner,
}

impl TestApp {
    pub fn spawn() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AccountConfig) -> Self {
        init_tracing();

        let store = Arc::new(InMemoryAccountStore::new());
        let services = AccountServices::build(Arc::clone(&store), &config)
            .expect("Failed to build account services");
        let signer = TokenSigner::new(config.tokens.secret.as_bytes());

        Self {
            store,
            services,
            config,
            signer,
        }
    }

    /// OAuth authenticator over the app's store with a scripted provider.
    pub fn oauth(
        &self,
        provider: ScriptedProvider,
    ) -> OAuthAuthenticator<InMemoryAccountStore, ScriptedProvider> {
        services::oauth(
            &self.store,
            provider,
            &self.config,
            Default::default(),
        )
    }
}

/// Provider adapter that answers every code with a fixed profile.
///
/// The code `"bad"` is rejected the way a real provider rejects a stale code.
pub struct ScriptedProvider {
    id: String,
    profile: ProviderProfile,
}

impl ScriptedProvider {
    pub fn new(id: &str, provider_user_id: &str, email: &str, email_verified: bool) -> Self {
        Self {
            id: id.to_string(),
            profile: ProviderProfile {
                provider_user_id: provider_user_id.to_string(),
                email: email.to_string(),
                email_verified,
                display_name: None,
                avatar_url: None,
            },
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn auth_url(&self, state: &str) -> String {
        format!("https://{}.test/authorize?state={}", self.id, state)
    }

    async fn resolve_profile(&self, code: &str) -> Result<ProviderProfile, ProviderError> {
        if code == "bad" {
            return Err(ProviderError::InvalidCode("invalid_grant".to_string()));
        }
        Ok(self.profile.clone())
    }
}

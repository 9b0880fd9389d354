use std::env;
use std::time::Duration as StdDuration;

use auth::HashingParams;
use chrono::Duration;
use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::domain::hooks::DEFAULT_HOOK_TIMEOUT;
use crate::domain::magic_link::service::DEFAULT_MAGIC_LINK_TTL_SECS;
use crate::domain::oauth::service::DEFAULT_STATE_TTL_SECS;
use crate::domain::password::service::DEFAULT_RESET_TTL_SECS;
use crate::domain::user::service::DEFAULT_EMAIL_CHANGE_TTL_SECS;
use crate::domain::validation::PasswordPolicy;

/// Minimum signing secret length accepted by [`AccountConfig::load`].
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Deserialize, Clone)]
pub struct AccountConfig {
    pub tokens: TokenConfig,
    #[serde(default)]
    pub password: PasswordPolicy,
    #[serde(default)]
    pub hashing: HashingConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub hooks: HookConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// HMAC secret shared by every signed token flow.
    pub secret: String,
    #[serde(default = "default_reset_ttl")]
    pub password_reset_ttl_secs: i64,
    #[serde(default = "default_magic_link_ttl")]
    pub magic_link_ttl_secs: i64,
    #[serde(default = "default_email_change_ttl")]
    pub email_change_ttl_secs: i64,
}

impl TokenConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            password_reset_ttl_secs: default_reset_ttl(),
            magic_link_ttl_secs: default_magic_link_ttl(),
            email_change_ttl_secs: default_email_change_ttl(),
        }
    }

    pub fn password_reset_ttl(&self) -> Duration {
        Duration::seconds(self.password_reset_ttl_secs)
    }

    pub fn magic_link_ttl(&self) -> Duration {
        Duration::seconds(self.magic_link_ttl_secs)
    }

    pub fn email_change_ttl(&self) -> Duration {
        Duration::seconds(self.email_change_ttl_secs)
    }
}

/// Argon2 work factors.
#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct HashingConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        let params = HashingParams::default();
        Self {
            memory_kib: params.memory_kib,
            iterations: params.iterations,
            parallelism: params.parallelism,
        }
    }
}

impl From<HashingConfig> for HashingParams {
    fn from(config: HashingConfig) -> Self {
        HashingParams {
            memory_kib: config.memory_kib,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OAuthConfig {
    pub state_ttl_secs: i64,
    /// Refuse provider emails the provider has not verified.
    pub verified_only: bool,
    pub google: Option<OAuthClientConfig>,
    pub github: Option<OAuthClientConfig>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: DEFAULT_STATE_TTL_SECS,
            verified_only: true,
            google: None,
            github: None,
        }
    }
}

impl OAuthConfig {
    pub fn state_ttl(&self) -> Duration {
        Duration::seconds(self.state_ttl_secs)
    }
}

/// Credentials registered with an OAuth provider.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct OAuthClientConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct HookConfig {
    pub timeout_ms: u64,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_HOOK_TIMEOUT.as_millis() as u64,
        }
    }
}

impl HookConfig {
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_millis(self.timeout_ms)
    }
}

fn default_reset_ttl() -> i64 {
    DEFAULT_RESET_TTL_SECS
}

fn default_magic_link_ttl() -> i64 {
    DEFAULT_MAGIC_LINK_TTL_SECS
}

fn default_email_change_ttl() -> i64 {
    DEFAULT_EMAIL_CHANGE_TTL_SECS
}

impl AccountConfig {
    /// Defaults everywhere except the signing secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            tokens: TokenConfig::new(secret),
            password: PasswordPolicy::default(),
            hashing: HashingConfig::default(),
            oauth: OAuthConfig::default(),
            hooks: HookConfig::default(),
        }
    }

    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (TOKENS__SECRET, OAUTH__VERIFIED_ONLY, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: OAUTH__GOOGLE__CLIENT_ID=... overrides oauth.google.client_id
            .add_source(Environment::default().separator("__"))
            .build()?;

        let config: AccountConfig = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Message(format!(
                "tokens.secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        let ttls = [
            ("tokens.password_reset_ttl_secs", self.tokens.password_reset_ttl_secs),
            ("tokens.magic_link_ttl_secs", self.tokens.magic_link_ttl_secs),
            ("tokens.email_change_ttl_secs", self.tokens.email_change_ttl_secs),
            ("oauth.state_ttl_secs", self.oauth.state_ttl_secs),
        ];
        if let Some((name, _)) = ttls.iter().find(|(_, secs)| *secs <= 0) {
            return Err(ConfigError::Message(format!("{} must be positive", name)));
        }

        if self.hooks.timeout_ms == 0 {
            return Err(ConfigError::Message(
                "hooks.timeout_ms must be positive".to_string(),
            ));
        }

        let policy = &self.password;
        if policy.min_length == 0 || policy.min_length > policy.max_length {
            return Err(ConfigError::Message(
                "password.min_length must be between 1 and password.max_length".to_string(),
            ));
        }
        if policy.min_character_classes > 4 {
            return Err(ConfigError::Message(
                "password.min_character_classes cannot exceed 4".to_string(),
            ));
        }

        Ok(())
    }
}

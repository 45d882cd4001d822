use std::sync::OnceLock;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::EnvConfig;
use crate::token::SessionToken;

static AUTH_CONFIG: OnceLock<AuthConfig> = OnceLock::new();

/// Settings handed to the managed identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    pub region: String,
    pub user_pool_id: String,
    pub user_pool_web_client_id: String,
    pub identity_pool_id: String,
    pub storage_bucket: String,
}

impl From<&EnvConfig> for AuthConfig {
    fn from(env: &EnvConfig) -> Self {
        Self {
            region: env.region.to_owned(),
            user_pool_id: env.user_pool_id.to_owned(),
            user_pool_web_client_id: env.user_pool_web_client_id.to_owned(),
            identity_pool_id: env.identity_pool_id.to_owned(),
            storage_bucket: env.storage_bucket.to_owned(),
        }
    }
}

/// Configure the identity provider. Only the first call in a process takes effect.
pub fn configure(env: &EnvConfig) -> &'static AuthConfig {
    let mut configured_now = false;
    let config = AUTH_CONFIG.get_or_init(|| {
        configured_now = true;
        AuthConfig::from(env)
    });

    if configured_now {
        tracing::info!(
            region = %config.region,
            user_pool = %config.user_pool_id,
            "identity provider configured"
        );
    } else {
        tracing::debug!("identity provider already configured, keeping the first configuration");
    }
    config
}

pub fn auth_config() -> Option<&'static AuthConfig> {
    AUTH_CONFIG.get()
}

/// Source of the current user's session.
///
/// Token lifetime and refresh belong to the provider; callers ask for a token
/// every time they need one.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// `Ok(None)` means there is no signed-in user
    async fn current_session_token(&self) -> Result<Option<SessionToken>>;

    async fn sign_out(&self) -> Result<()>;

    async fn is_authenticated(&self) -> bool {
        matches!(self.current_session_token().await, Ok(Some(_)))
    }
}

/// In-process session holder
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<SessionToken>>,
}

impl MemorySession {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(token: SessionToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    pub fn sign_in(&self, token: SessionToken) {
        *self.token.write() = Some(token);
        tracing::info!("signed in");
    }
}

#[async_trait]
impl SessionProvider for MemorySession {
    async fn current_session_token(&self) -> Result<Option<SessionToken>> {
        Ok(self.token.read().clone())
    }

    async fn sign_out(&self) -> Result<()> {
        if self.token.write().take().is_some() {
            tracing::info!("signed out");
        }
        Ok(())
    }
}

/// Session read from the `CYPHER_SESSION_TOKEN` environment variable (or `.env` file)
#[cfg(feature = "env-file")]
#[derive(Debug, Default)]
pub struct EnvSession {
    signed_out: std::sync::atomic::AtomicBool,
}

#[cfg(feature = "env-file")]
impl EnvSession {
    pub fn new() -> Self {
        dotenvy::dotenv().ok();
        Self::default()
    }
}

#[cfg(feature = "env-file")]
#[async_trait]
impl SessionProvider for EnvSession {
    async fn current_session_token(&self) -> Result<Option<SessionToken>> {
        use std::sync::atomic::Ordering;

        if self.signed_out.load(Ordering::Acquire) {
            return Ok(None);
        }
        match dotenvy::var(crate::constant::SESSION_TOKEN_ENV) {
            Ok(token) => Ok(SessionToken::new(token)),
            Err(dotenvy::Error::EnvVar(std::env::VarError::NotPresent)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.signed_out
            .store(true, std::sync::atomic::Ordering::Release);
        Ok(())
    }
}

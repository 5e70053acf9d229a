use crate::config::AppConfig;
use crate::db::{self, DbPool, PgCredentialStore};
use crate::services::{AccountService, ImageStore};
use anyhow::{Context, Result};
use auth_gateway::AuthGate;
use auth_identity::{
    AuthSessionManager, Clock, CredentialStore, RedisSessionRegistry, SessionRegistry,
    SystemClock,
};
use auth_oauth::{GoogleIdentityProvider, IdentityProvider};
use email_service::{AccountEmails, EmailDispatcher, SmtpEmailService};
use error_common::ServiceError;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AccountServer {
    pub config: Arc<AppConfig>,
    /// Login, refresh, logout and authorization
    pub sessions: Arc<AuthSessionManager>,
    /// Everything else an account can do
    pub accounts: Arc<AccountService>,
    /// Absent when Google sign-in is not configured
    pub oauth: Option<Arc<dyn IdentityProvider>>,
    pub gate: AuthGate,
    pub registry: Arc<dyn SessionRegistry>,
    /// Only set when running against Postgres
    pub database: Option<DbPool>,
    pub started_at: Instant,
}

/// Collaborators an [`AccountServer`] is assembled from
pub struct ServerParts {
    pub config: AppConfig,
    pub store: Arc<dyn CredentialStore>,
    pub registry: Arc<dyn SessionRegistry>,
    pub mailer: Arc<dyn EmailDispatcher>,
    pub oauth: Option<Arc<dyn IdentityProvider>>,
    pub clock: Arc<dyn Clock>,
    pub database: Option<DbPool>,
}

impl AccountServer {
    /// Connect to Postgres, Redis, SMTP and the OAuth provider named in `config`
    pub async fn connect(config: AppConfig) -> error_common::Result<Self> {
        let pool = db::connect(&config.database_url)
            .await
            .map_err(|e| ServiceError::DatabaseError(format!("{e:#}")))?;
        info!("Connected to Postgres");

        let registry = RedisSessionRegistry::connect(&config.auth.registry.redis_url)
            .await
            .map_err(|e| ServiceError::RegistryError(e.to_string()))?;
        info!("Connected to session registry");

        let oauth = match &config.google {
            Some(google) => {
                let provider = GoogleIdentityProvider::new(google.clone())
                    .map_err(|e| ServiceError::ConfigError(format!("Google sign-in: {e}")))?;
                info!("Google sign-in enabled");
                Some(Arc::new(provider) as Arc<dyn IdentityProvider>)
            }
            None => None,
        };

        let mailer = Arc::new(SmtpEmailService::new(config.email.clone()));

        Self::from_parts(ServerParts {
            store: Arc::new(PgCredentialStore::new(pool.clone())),
            registry: Arc::new(registry),
            mailer,
            oauth,
            clock: Arc::new(SystemClock),
            database: Some(pool),
            config,
        })
        .map_err(|e| ServiceError::ConfigError(format!("{e:#}")))
    }

    pub fn from_parts(parts: ServerParts) -> Result<Self> {
        let ServerParts {
            config,
            store,
            registry,
            mailer,
            oauth,
            clock,
            database,
        } = parts;

        let sessions = Arc::new(
            AuthSessionManager::new(&config.auth, registry.clone(), store.clone(), clock)
                .context("building the auth session manager")?,
        );

        let emails = AccountEmails::new(&config.client_url)
            .context("loading email templates")?
            .with_sender(config.email.from_name.clone());
        let accounts = Arc::new(AccountService::new(
            &sessions,
            store,
            mailer,
            emails,
            ImageStore::new(config.profile_image_dir()),
            config.auth.password.clone(),
            config.auth.account.clone(),
        ));

        Ok(Self {
            gate: AuthGate::new(sessions.clone()),
            config: Arc::new(config),
            sessions,
            accounts,
            oauth,
            registry,
            database,
            started_at: Instant::now(),
        })
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

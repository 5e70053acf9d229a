//! Google sign-in over OAuth2 authorization code + PKCE
//!
//! PKCE verifiers are kept in process memory keyed by the CSRF state, so the
//! callback must reach the instance that issued the redirect. States older
//! than ten minutes are discarded.

use crate::error::{OAuthError, Result};
use crate::models::{AuthorizationRequest, OAuthProfile, UserInfo};
use crate::provider::IdentityProvider;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Maximum age of a pending handshake
const STATE_TTL_MINUTES: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Must match the redirect URI registered with Google
    pub callback_url: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    vec!["openid".into(), "email".into(), "profile".into()]
}

impl GoogleOAuthConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_CALLBACK_URL`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| OAuthError::Configuration(format!("{key} is not set")))
        };
        Ok(Self {
            client_id: require("GOOGLE_CLIENT_ID")?,
            client_secret: require("GOOGLE_CLIENT_SECRET")?,
            callback_url: require("GOOGLE_CALLBACK_URL")?,
            scopes: default_scopes(),
        })
    }
}

#[derive(Debug, Clone)]
struct PkceState {
    verifier: String,
    created_at: DateTime<Utc>,
}

pub struct GoogleIdentityProvider {
    oauth_client: BasicClient,
    http_client: HttpClient,
    scopes: Vec<String>,
    pkce_cache: RwLock<HashMap<String, PkceState>>,
}

impl GoogleIdentityProvider {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self> {
        let invalid = |what: &str, e: oauth2::url::ParseError| {
            OAuthError::Configuration(format!("invalid {what}: {e}"))
        };

        let oauth_client = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            AuthUrl::new(GOOGLE_AUTH_URL.to_string()).map_err(|e| invalid("auth URL", e))?,
            Some(TokenUrl::new(GOOGLE_TOKEN_URL.to_string()).map_err(|e| invalid("token URL", e))?),
        )
        .set_redirect_uri(
            RedirectUrl::new(config.callback_url).map_err(|e| invalid("callback URL", e))?,
        );

        let http_client = HttpClient::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        Ok(Self {
            oauth_client,
            http_client,
            scopes: config.scopes,
            pkce_cache: RwLock::new(HashMap::new()),
        })
    }

    /// Pending handshakes not yet completed or expired
    pub async fn pending_states(&self) -> usize {
        self.pkce_cache.read().await.len()
    }

    async fn take_verifier(&self, state: &str) -> Result<String> {
        let pending = self
            .pkce_cache
            .write()
            .await
            .remove(state)
            .ok_or(OAuthError::InvalidState)?;

        if Utc::now() - pending.created_at > Duration::minutes(STATE_TTL_MINUTES) {
            return Err(OAuthError::InvalidState);
        }
        Ok(pending.verifier)
    }

    async fn cleanup_expired_states(&self) {
        let cutoff = Utc::now() - Duration::minutes(STATE_TTL_MINUTES);
        self.pkce_cache
            .write()
            .await
            .retain(|_, pending| pending.created_at > cutoff);
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo> {
        let response = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OAuthError::ExternalProviderError(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        Ok(response.json::<UserInfo>().await?)
    }
}

#[async_trait]
impl IdentityProvider for GoogleIdentityProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn authorization_url(&self) -> Result<AuthorizationRequest> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = self
            .oauth_client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge)
            .add_scopes(self.scopes.iter().map(|s| Scope::new(s.clone())))
            .url();

        self.cleanup_expired_states().await;
        let state = csrf_state.secret().clone();
        self.pkce_cache.write().await.insert(
            state.clone(),
            PkceState {
                verifier: pkce_verifier.secret().clone(),
                created_at: Utc::now(),
            },
        );

        Ok(AuthorizationRequest {
            url: auth_url.to_string(),
            state,
        })
    }

    async fn resolve(&self, code: &str, state: &str) -> Result<OAuthProfile> {
        let verifier = self.take_verifier(state).await?;

        let token = self
            .oauth_client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                warn!(error = %e, "Google code exchange failed");
                OAuthError::ExchangeFailed(e.to_string())
            })?;

        let profile = self
            .fetch_userinfo(token.access_token().secret())
            .await?
            .into_profile()?;
        debug!(external_subject_id = %profile.external_subject_id, "Google profile resolved");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GoogleIdentityProvider {
        GoogleIdentityProvider::new(GoogleOAuthConfig {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            callback_url: "http://localhost:5000/api/auth/google/callback".into(),
            scopes: default_scopes(),
        })
        .unwrap()
    }

    #[test]
    fn test_config_requires_all_keys() {
        let err = GoogleOAuthConfig::from_lookup(|key| {
            (key == "GOOGLE_CLIENT_ID").then(|| "id".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, OAuthError::Configuration(ref m) if m.contains("GOOGLE_CLIENT_SECRET")));
    }

    #[tokio::test]
    async fn test_authorization_url_carries_pkce_and_state() {
        let provider = provider();
        let request = provider.authorization_url().await.unwrap();

        assert!(request.url.starts_with(GOOGLE_AUTH_URL));
        assert!(request.url.contains("code_challenge_method=S256"));
        assert!(request.url.contains(&format!("state={}", request.state)));
        assert!(request.url.contains("client_id=client-id"));
        assert_eq!(provider.pending_states().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_state_rejected_before_exchange() {
        let provider = provider();
        provider.authorization_url().await.unwrap();

        let result = provider.resolve("code", "forged-state").await;
        assert!(matches!(result, Err(OAuthError::InvalidState)));
        assert_eq!(provider.pending_states().await, 1);
    }
}

use crate::error::Result;
use crate::models::{AuthorizationRequest, OAuthProfile};
use async_trait::async_trait;

/// External identity provider driven through the authorization-code flow
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name used in routes and logs
    fn name(&self) -> &str;

    /// Start a handshake; `state` must come back on the callback
    async fn authorization_url(&self) -> Result<AuthorizationRequest>;

    /// Finish a handshake, yielding the provider-asserted profile
    async fn resolve(&self, code: &str, state: &str) -> Result<OAuthProfile>;
}

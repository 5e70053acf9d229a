//! OAuth 2.0 identity provider boundary for the account service
//!
//! The authorization-code handshake (PKCE, CSRF state, code exchange and the
//! userinfo call) stays inside this crate. Callers see two steps:
//! - [`IdentityProvider::authorization_url`] to start the redirect
//! - [`IdentityProvider::resolve`] to turn the callback into an [`OAuthProfile`]
//!   with a stable external subject id and a verified email
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_oauth::{GoogleIdentityProvider, GoogleOAuthConfig, IdentityProvider};
//!
//! # async fn run() -> auth_oauth::Result<()> {
//! let provider = GoogleIdentityProvider::new(GoogleOAuthConfig::from_env()?)?;
//! let request = provider.authorization_url().await?;
//! // ... user is redirected to request.url and comes back with ?code=&state=
//! let profile = provider.resolve("code-from-callback", &request.state).await?;
//! println!("{} <{}>", profile.external_subject_id, profile.email);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
pub mod provider;

pub use client::*;
pub use error::*;
pub use models::*;
pub use provider::*;

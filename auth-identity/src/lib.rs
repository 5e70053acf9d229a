//! Identity and session lifecycle for the account service
//!
//! This crate owns everything that decides whether a caller is who they claim
//! to be:
//! - Account model, roles and the [`Identity`] claim set
//! - Access/refresh token signing with distinct secrets ([`TokenSigner`])
//! - The shared [`SessionRegistry`] of live refresh tokens and revocations
//! - The [`AuthSessionManager`] orchestrating login, refresh, logout and
//!   authorization
//! - The [`CredentialStore`] persistence boundary and Argon2id hashing
//!
//! # Example
//!
//! ```rust,no_run
//! use auth_identity::{
//!     AuthConfig, AuthSessionManager, InMemoryCredentialStore, InMemorySessionRegistry,
//!     PasswordCredentials, SystemClock, TokenConfig,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> auth_identity::Result<()> {
//! let clock = Arc::new(SystemClock);
//! let manager = AuthSessionManager::new(
//!     &AuthConfig::new(TokenConfig::new("access-secret", "refresh-secret")),
//!     Arc::new(InMemorySessionRegistry::new(clock.clone())),
//!     Arc::new(InMemoryCredentialStore::new()),
//!     clock,
//! )?;
//!
//! let session = manager
//!     .login(&PasswordCredentials {
//!         email: "user@example.com".into(),
//!         password: "Secret123".into(),
//!     })
//!     .await?;
//! let identity = manager.authorize(&session.tokens.access_token).await?;
//! manager.logout(&session.tokens.access_token).await?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod identity;
pub mod password;
pub mod registry;
pub mod session;
pub mod store;
pub mod tokens;

pub use clock::*;
pub use config::*;
pub use error::*;
pub use identity::*;
pub use password::*;
pub use registry::*;
pub use session::*;
pub use store::*;
pub use tokens::*;

//! Access and refresh token signing.
//!
//! Both kinds are HS256 JWTs carrying `{sub, email, role}` plus issued-at and
//! expiry. Each kind has its own secret, so an access token never verifies as
//! a refresh token and vice versa. Expiry is checked against the injected
//! [`Clock`] with zero leeway.

use crate::clock::Clock;
use crate::config::TokenConfig;
use crate::error::{IdentityError, Result};
use crate::identity::{Identity, Role};
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims for both token kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (account ID)
    pub sub: String,

    pub email: String,

    pub role: Role,

    /// JWT ID, unique per issued token
    pub jti: String,

    /// Issuer
    pub iss: String,

    /// Issued at (seconds since epoch)
    pub iat: i64,

    /// Expiration (seconds since epoch)
    pub exp: i64,
}

impl TokenClaims {
    pub fn identity(&self) -> Result<Identity> {
        let subject_id = Uuid::parse_str(&self.sub).map_err(|_| IdentityError::InvalidToken)?;
        Ok(Identity {
            subject_id,
            email: self.email.clone(),
            role: self.role,
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Lifetime left at `now`, if any
    pub fn remaining_lifetime(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        (self.expires_at() - now).to_std().ok().filter(|d| !d.is_zero())
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl SigningKeys {
    fn from_secret(secret: &str, ttl: std::time::Duration) -> Result<Self> {
        let ttl = Duration::from_std(ttl)
            .map_err(|e| IdentityError::Configuration(format!("token lifetime out of range: {e}")))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }
}

/// Issues and verifies access and refresh tokens
pub struct TokenSigner {
    access: SigningKeys,
    refresh: SigningKeys,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl TokenSigner {
    /// Fails when a secret is empty or both kinds share one secret
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.access_secret.is_empty() || config.refresh_secret.is_empty() {
            return Err(IdentityError::Configuration(
                "token secrets must not be empty".into(),
            ));
        }
        if config.access_secret == config.refresh_secret {
            return Err(IdentityError::Configuration(
                "access and refresh tokens must use distinct secrets".into(),
            ));
        }
        if config.access_token_lifetime == 0 || config.refresh_token_lifetime == 0 {
            return Err(IdentityError::Configuration(
                "token lifetimes must be positive".into(),
            ));
        }

        Ok(Self {
            access: SigningKeys::from_secret(&config.access_secret, config.access_token_ttl())?,
            refresh: SigningKeys::from_secret(&config.refresh_secret, config.refresh_token_ttl())?,
            issuer: config.issuer.clone(),
            clock,
        })
    }

    pub fn issue_access(&self, identity: &Identity) -> Result<String> {
        self.issue(identity, TokenKind::Access)
    }

    pub fn issue_refresh(&self, identity: &Identity) -> Result<String> {
        self.issue(identity, TokenKind::Refresh)
    }

    /// Check signature, issuer and expiry, returning the embedded identity
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Identity> {
        self.verify_claims(token, kind)?.identity()
    }

    pub fn verify_claims(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
        let claims = self.decode_ignoring_expiry(token, kind)?;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(IdentityError::InvalidToken);
        }
        Ok(claims)
    }

    /// Signature and issuer are still checked; only expiry is skipped
    pub fn decode_ignoring_expiry(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);

        decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(kind = ?kind, error = %e, "Token rejected");
                IdentityError::InvalidToken
            })
    }

    fn issue(&self, identity: &Identity, kind: TokenKind) -> Result<String> {
        let keys = self.keys(kind);
        let now = self.clock.now();
        let claims = TokenClaims {
            sub: identity.subject_id.to_string(),
            email: identity.email.clone(),
            role: identity.role,
            jti: Uuid::new_v4().to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + keys.ttl).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| IdentityError::Configuration(format!("failed to sign token: {e}")))
    }

    fn keys(&self, kind: TokenKind) -> &SigningKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }
}

use crate::error::{IdentityError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Authentication configuration for the session lifecycle and account flows
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT token configuration
    pub token: TokenConfig,

    /// Session registry connection
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Password strength rules
    #[serde(default)]
    pub password: PasswordPolicy,

    /// Argon2 cost parameters
    #[serde(default)]
    pub hashing: HashingConfig,

    /// Account lifecycle settings
    #[serde(default)]
    pub account: AccountConfig,
}

/// JWT token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// HMAC secret for access tokens
    pub access_secret: String,

    /// HMAC secret for refresh tokens, must differ from `access_secret`
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default: 900 = 15 minutes)
    #[serde(default = "default_access_token_lifetime")]
    pub access_token_lifetime: u64,

    /// Refresh token lifetime in days (default: 7 days)
    #[serde(default = "default_refresh_token_lifetime")]
    pub refresh_token_lifetime: u64,

    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,
}

/// Session registry (Redis) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegistryConfig {
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
}

/// Password strength rules applied on registration, reset and change
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PasswordPolicy {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    #[serde(default = "default_true")]
    pub require_uppercase: bool,
    #[serde(default = "default_true")]
    pub require_lowercase: bool,
    #[serde(default = "default_true")]
    pub require_digit: bool,
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct HashingConfig {
    /// Memory in KiB (default: 19456 = 19 MiB)
    #[serde(default = "default_memory_kib")]
    pub memory_kib: u32,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AccountConfig {
    /// Password reset link lifetime in minutes (default: 60)
    #[serde(default = "default_reset_token_lifetime")]
    pub reset_token_lifetime_minutes: u64,
}

// Default value functions
fn default_access_token_lifetime() -> u64 {
    900 // 15 minutes
}

fn default_refresh_token_lifetime() -> u64 {
    7 // 7 days
}

fn default_issuer() -> String {
    "account-service".to_string()
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_min_length() -> usize {
    6
}

fn default_true() -> bool {
    true
}

fn default_memory_kib() -> u32 {
    19456
}

fn default_iterations() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}

fn default_reset_token_lifetime() -> u64 {
    60
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            redis_url: default_redis_url(),
        }
    }
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: default_min_length(),
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
        }
    }
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: default_memory_kib(),
            iterations: default_iterations(),
            parallelism: default_parallelism(),
        }
    }
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            reset_token_lifetime_minutes: default_reset_token_lifetime(),
        }
    }
}

impl TokenConfig {
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_token_lifetime: default_access_token_lifetime(),
            refresh_token_lifetime: default_refresh_token_lifetime(),
            issuer: default_issuer(),
        }
    }

    pub fn access_token_ttl(&self) -> Duration {
        Duration::from_secs(self.access_token_lifetime)
    }

    pub fn refresh_token_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_token_lifetime * 24 * 3600)
    }
}

impl PasswordPolicy {
    /// Check a candidate password, listing every rule it misses
    pub fn validate(&self, password: &str) -> Result<()> {
        let mut missing = Vec::new();
        if password.chars().count() < self.min_length {
            missing.push(format!("at least {} characters", self.min_length));
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            missing.push("an uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            missing.push("a lowercase letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            missing.push("a number".to_string());
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(IdentityError::WeakPassword(format!(
                "Password must contain {}",
                missing.join(", ")
            )))
        }
    }
}

impl AccountConfig {
    pub fn reset_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::try_from(self.reset_token_lifetime_minutes).unwrap_or(60))
    }
}

impl AuthConfig {
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            registry: RegistryConfig::default(),
            password: PasswordPolicy::default(),
            hashing: HashingConfig::default(),
            account: AccountConfig::default(),
        }
    }

    /// Load from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            IdentityError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            IdentityError::Configuration(format!("invalid auth config {}: {e}", path.display()))
        })
    }

    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    ///
    /// Recognised keys: `JWT_SECRET`, `JWT_REFRESH_SECRET`, `JWT_EXPIRE`,
    /// `JWT_REFRESH_EXPIRE`, `JWT_ISSUER`, `REDIS_URL` (or `REDIS_HOST` and
    /// `REDIS_PORT`), `PASSWORD_MIN_LENGTH`, `RESET_TOKEN_EXPIRE_MINUTES`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let access_secret = lookup("JWT_SECRET")
            .ok_or_else(|| IdentityError::Configuration("JWT_SECRET is not set".into()))?;
        let refresh_secret = lookup("JWT_REFRESH_SECRET")
            .ok_or_else(|| IdentityError::Configuration("JWT_REFRESH_SECRET is not set".into()))?;

        let mut token = TokenConfig::new(access_secret, refresh_secret);
        if let Some(raw) = lookup("JWT_EXPIRE") {
            token.access_token_lifetime = parse_lifetime(&raw).ok_or_else(|| {
                IdentityError::Configuration(format!("invalid JWT_EXPIRE: {raw}"))
            })?;
        }
        if let Some(raw) = lookup("JWT_REFRESH_EXPIRE") {
            // Bare numbers are days; suffixed values are rounded up to whole days
            let days = match raw.trim().parse::<u64>() {
                Ok(days) => days,
                Err(_) => parse_lifetime(&raw)
                    .map(|secs| secs.div_ceil(86_400))
                    .ok_or_else(|| {
                        IdentityError::Configuration(format!("invalid JWT_REFRESH_EXPIRE: {raw}"))
                    })?,
            };
            token.refresh_token_lifetime = days.max(1);
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            token.issuer = issuer;
        }

        let redis_url = lookup("REDIS_URL").unwrap_or_else(|| {
            let host = lookup("REDIS_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
            let port = lookup("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
            format!("redis://{host}:{port}")
        });

        let mut config = Self::new(token);
        config.registry = RegistryConfig { redis_url };
        if let Some(min) = lookup("PASSWORD_MIN_LENGTH").and_then(|v| v.parse().ok()) {
            config.password.min_length = min;
        }
        if let Some(minutes) = lookup("RESET_TOKEN_EXPIRE_MINUTES").and_then(|v| v.parse().ok()) {
            config.account.reset_token_lifetime_minutes = minutes;
        }
        Ok(config)
    }
}

/// Parse `"900"`, `"15m"`, `"1h"` or `"7d"` into seconds
pub fn parse_lifetime(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => return None,
    };
    value.checked_mul(multiplier)
}

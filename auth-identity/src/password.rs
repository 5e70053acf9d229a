//! Argon2id password hashing
//!
//! Hashing and verification are CPU-bound and run on the blocking pool.

use crate::config::HashingConfig;
use crate::error::{IdentityError, Result};
use std::sync::Arc;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    /// Hash with the configured params that no submitted password matches
    decoy: Arc<str>,
}

impl CredentialHasher {
    pub fn new(config: HashingConfig) -> Result<Self> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            Some(32),
        )
        .map_err(|e| IdentityError::Configuration(format!("invalid Argon2 params: {e}")))?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let decoy = argon2
            .hash_password(&rand::random::<[u8; 32]>(), &salt)
            .map_err(|e| IdentityError::Configuration(format!("failed to build decoy hash: {e}")))?
            .to_string();

        Ok(Self {
            argon2,
            decoy: decoy.into(),
        })
    }

    pub async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let argon2 = self.argon2.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| IdentityError::Hashing(format!("failed to hash password: {e}")))
        })
        .await
        .map_err(|e| IdentityError::Hashing(format!("hashing task failed: {e}")))?
    }

    /// `Ok(false)` on mismatch; `Err` only for unreadable hashes
    pub async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let argon2 = self.argon2.clone();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| IdentityError::Hashing(format!("unreadable password hash: {e}")))?;
            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(IdentityError::Hashing(format!("verification failed: {e}"))),
            }
        })
        .await
        .map_err(|e| IdentityError::Hashing(format!("verification task failed: {e}")))?
    }

    /// Full-cost verification for logins that have no stored hash to check
    pub async fn verify_decoy(&self, password: &str) -> Result<()> {
        self.verify(password, &self.decoy).await.map(|_| ())
    }
}

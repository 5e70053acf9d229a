//! Session registry: live refresh token and revocation entry per subject
//!
//! Two single-key records per subject, both with a store-side TTL:
//! - `refresh_{subject}` holds the one refresh token currently accepted
//! - `bl_{subject}` blocks every access token of the subject until it lapses
//!
//! The Redis backend is shared by every server instance. The in-memory backend
//! honours TTLs against the injected clock and exists for tests and local runs.

use crate::clock::Clock;
use crate::error::{IdentityError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, AsyncCommands};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// Overwrite the subject's refresh entry
    async fn set_refresh(&self, subject_id: Uuid, token: &str, ttl: Duration) -> Result<()>;

    async fn get_refresh(&self, subject_id: Uuid) -> Result<Option<String>>;

    async fn delete_refresh(&self, subject_id: Uuid) -> Result<()>;

    /// Store a revocation entry that lapses after `ttl_remaining`
    async fn revoke(&self, subject_id: Uuid, token: &str, ttl_remaining: Duration) -> Result<()>;

    async fn is_revoked(&self, subject_id: Uuid) -> Result<bool>;

    async fn health_check(&self) -> Result<()>;
}

pub fn refresh_key(subject_id: Uuid) -> String {
    format!("refresh_{subject_id}")
}

pub fn revocation_key(subject_id: Uuid) -> String {
    format!("bl_{subject_id}")
}

/// Whole seconds, rounded up; Redis rejects `SETEX` with zero
fn ttl_seconds(ttl: Duration) -> u64 {
    (ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0)).max(1)
}

/// Redis-backed registry
#[derive(Clone)]
pub struct RedisSessionRegistry {
    redis: ConnectionManager,
}

impl RedisSessionRegistry {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(|e| {
            IdentityError::Configuration(format!("invalid Redis URL: {e}"))
        })?;
        let redis = ConnectionManager::new(client).await?;
        Ok(Self { redis })
    }

    pub fn from_connection(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl SessionRegistry for RedisSessionRegistry {
    async fn set_refresh(&self, subject_id: Uuid, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(refresh_key(subject_id), token, ttl_seconds(ttl))
            .await?;
        Ok(())
    }

    async fn get_refresh(&self, subject_id: Uuid) -> Result<Option<String>> {
        let mut conn = self.redis.clone();
        Ok(conn
            .get::<_, Option<String>>(refresh_key(subject_id))
            .await?)
    }

    async fn delete_refresh(&self, subject_id: Uuid) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(refresh_key(subject_id)).await?;
        Ok(())
    }

    async fn revoke(&self, subject_id: Uuid, token: &str, ttl_remaining: Duration) -> Result<()> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(
            revocation_key(subject_id),
            token,
            ttl_seconds(ttl_remaining),
        )
        .await?;
        Ok(())
    }

    async fn is_revoked(&self, subject_id: Uuid) -> Result<bool> {
        let mut conn = self.redis.clone();
        Ok(conn.exists::<_, bool>(revocation_key(subject_id)).await?)
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self.redis.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: DateTime<Utc>,
}

/// In-process registry with clock-driven expiry
#[derive(Debug)]
pub struct InMemorySessionRegistry {
    entries: RwLock<HashMap<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl InMemorySessionRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    async fn put(&self, key: String, value: &str, ttl: Duration) -> Result<()> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| IdentityError::RegistryUnavailable(format!("ttl out of range: {e}")))?;
        let expires_at = self.clock.now() + ttl;
        self.entries.write().await.insert(
            key,
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }

    async fn live(&self, key: &str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Number of unexpired entries
    pub async fn len(&self) -> usize {
        let now = self.clock.now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl SessionRegistry for InMemorySessionRegistry {
    async fn set_refresh(&self, subject_id: Uuid, token: &str, ttl: Duration) -> Result<()> {
        self.put(refresh_key(subject_id), token, ttl).await
    }

    async fn get_refresh(&self, subject_id: Uuid) -> Result<Option<String>> {
        Ok(self.live(&refresh_key(subject_id)).await)
    }

    async fn delete_refresh(&self, subject_id: Uuid) -> Result<()> {
        self.entries.write().await.remove(&refresh_key(subject_id));
        Ok(())
    }

    async fn revoke(&self, subject_id: Uuid, token: &str, ttl_remaining: Duration) -> Result<()> {
        self.put(revocation_key(subject_id), token, ttl_remaining).await
    }

    async fn is_revoked(&self, subject_id: Uuid) -> Result<bool> {
        Ok(self.live(&revocation_key(subject_id)).await.is_some())
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn registry() -> (InMemorySessionRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (InMemorySessionRegistry::new(clock.clone()), clock)
    }

    #[test]
    fn test_keys() {
        let id = Uuid::nil();
        assert_eq!(refresh_key(id), format!("refresh_{id}"));
        assert_eq!(revocation_key(id), format!("bl_{id}"));
    }

    #[test]
    fn test_ttl_seconds_rounds_up() {
        assert_eq!(ttl_seconds(Duration::from_millis(1)), 1);
        assert_eq!(ttl_seconds(Duration::ZERO), 1);
        assert_eq!(ttl_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_seconds(Duration::from_secs(900)), 900);
    }

    #[tokio::test]
    async fn test_set_refresh_overwrites() {
        let (registry, _) = registry();
        let id = Uuid::new_v4();
        let ttl = Duration::from_secs(60);

        registry.set_refresh(id, "first", ttl).await.unwrap();
        registry.set_refresh(id, "second", ttl).await.unwrap();

        assert_eq!(registry.get_refresh(id).await.unwrap().as_deref(), Some("second"));
        assert_eq!(registry.len().await, 1);

        registry.delete_refresh(id).await.unwrap();
        assert!(registry.get_refresh(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revocation_lapses_with_ttl() {
        let (registry, clock) = registry();
        let id = Uuid::new_v4();

        registry.revoke(id, "token", Duration::from_secs(30)).await.unwrap();
        assert!(registry.is_revoked(id).await.unwrap());

        clock.advance(chrono::Duration::seconds(29));
        assert!(registry.is_revoked(id).await.unwrap());

        clock.advance(chrono::Duration::seconds(1));
        assert!(!registry.is_revoked(id).await.unwrap());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_subjects_are_isolated() {
        let (registry, _) = registry();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        registry.revoke(a, "token", Duration::from_secs(30)).await.unwrap();
        assert!(registry.is_revoked(a).await.unwrap());
        assert!(!registry.is_revoked(b).await.unwrap());
    }
}

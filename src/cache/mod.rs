//! Optional Redis cache for the character-set listing.

pub mod keys;

use std::time::Duration;

use rand::Rng;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;

const TTL_JITTER_RATIO: f64 = 0.1;

/// Fire-and-forget notification that cached set listings are stale.
pub trait ListingInvalidator: Send + Sync {
    fn invalidate_listing(&self);
}

/// Used when no listing cache is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl ListingInvalidator for NoopInvalidator {
    fn invalidate_listing(&self) {}
}

/// JSON values in Redis. Every failure degrades to a miss and is logged.
#[derive(Clone)]
pub struct RedisCache {
    connection: MultiplexedConnection,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self { connection })
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let mut conn = self.connection.clone();
        let payload: Option<String> = match conn.get(key).await {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(key, error = %err, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&payload?) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding unreadable cache entry");
                None
            }
        }
    }

    /// Stores `value` with a jittered expiry, never shorter than one second.
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let Ok(payload) = serde_json::to_string(value) else {
            return;
        };
        let ttl_secs = apply_ttl_jitter(ttl).as_secs().max(1);
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<()> = conn.set_ex(key, payload, ttl_secs).await;
        if let Err(err) = result {
            tracing::warn!(key, error = %err, "cache write failed");
        }
    }

    pub async fn delete(&self, key: &str) {
        let mut conn = self.connection.clone();
        let result: redis::RedisResult<u64> = conn.del(key).await;
        if let Err(err) = result {
            tracing::warn!(key, error = %err, "cache delete failed");
        }
    }
}

impl ListingInvalidator for RedisCache {
    fn invalidate_listing(&self) {
        let cache = self.clone();
        tokio::spawn(async move {
            cache.delete(keys::character_set_list_key()).await;
        });
    }
}

fn apply_ttl_jitter(ttl: Duration) -> Duration {
    let factor = rand::rng().random_range(1.0 - TTL_JITTER_RATIO..=1.0 + TTL_JITTER_RATIO);
    let jittered_ms = (ttl.as_millis() as f64 * factor).round().max(1.0);
    Duration::from_millis(jittered_ms as u64)
}

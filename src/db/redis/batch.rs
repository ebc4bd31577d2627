use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;

use crate::error::{AppError, AppResult};
use crate::models::{ContentId, UserId};
use crate::services::batch_store::BatchStore;

/// Cache key for one recommendation batch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub user_id: UserId,
    pub batch_index: u64,
}

impl Display for BatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feed:batch:{}:{}", self.user_id, self.batch_index)
    }
}

/// Creates a Redis client for the batch cache
///
/// Uses connection pooling via the connection-manager feature.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Redis-backed recommendation batch store
///
/// Batches are Redis lists: `size` is a plain LLEN and never touches batch
/// content, and `put` replaces the whole list inside a MULTI pipeline, so a
/// regeneration is atomic from any reader's perspective. Expiry is TTL-based
/// and owned here; entries are disposable and regenerable at any time.
pub struct RedisBatchStore {
    redis_client: Client,
    ttl_secs: u64,
}

impl RedisBatchStore {
    pub fn new(redis_client: Client, ttl_secs: u64) -> Self {
        Self {
            redis_client,
            ttl_secs,
        }
    }

    fn key(user_id: UserId, batch_index: u64) -> String {
        BatchKey {
            user_id,
            batch_index,
        }
        .to_string()
    }
}

#[async_trait::async_trait]
impl BatchStore for RedisBatchStore {
    async fn get(&self, user_id: UserId, batch_index: u64) -> AppResult<Option<Vec<ContentId>>> {
        let key = Self::key(user_id, batch_index);
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let raw: Vec<String> = conn.lrange(&key, 0, -1).await?;
        if raw.is_empty() {
            return Ok(None);
        }

        let batch = raw
            .iter()
            .map(|s| ContentId::parse_str(s))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Internal(format!("Corrupt batch entry {}: {}", key, e)))?;

        Ok(Some(batch))
    }

    async fn put(&self, user_id: UserId, batch_index: u64, batch: &[ContentId]) -> AppResult<()> {
        let key = Self::key(user_id, batch_index);
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let encoded: Vec<String> = batch.iter().map(|id| id.to_string()).collect();

        let mut pipe = redis::pipe();
        pipe.atomic().del(&key).ignore();
        if !encoded.is_empty() {
            pipe.rpush(&key, &encoded)
                .ignore()
                .expire(&key, self.ttl_secs as i64)
                .ignore();
        }
        let _: () = pipe.query_async(&mut conn).await?;

        tracing::debug!(
            key = %key,
            size = batch.len(),
            ttl = self.ttl_secs,
            "Stored recommendation batch"
        );

        Ok(())
    }

    async fn size(&self, user_id: UserId, batch_index: u64) -> AppResult<usize> {
        let key = Self::key(user_id, batch_index);
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let len: usize = conn.llen(&key).await?;
        Ok(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_batch_key_display() {
        let user_id = Uuid::parse_str("6f2c0e9a-4a1d-4c11-9e6b-6d1f6a3c7b21").unwrap();
        let key = BatchKey {
            user_id,
            batch_index: 3,
        };
        assert_eq!(
            key.to_string(),
            "feed:batch:6f2c0e9a-4a1d-4c11-9e6b-6d1f6a3c7b21:3"
        );
    }

    #[test]
    fn test_batch_keys_differ_per_index() {
        let user_id = Uuid::new_v4();
        let a = BatchKey {
            user_id,
            batch_index: 0,
        };
        let b = BatchKey {
            user_id,
            batch_index: 1,
        };
        assert_ne!(a.to_string(), b.to_string());
    }

    // Round-trip tests against a live Redis; run with
    // `cargo test -- --ignored` when REDIS_URL points somewhere real.

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_put_get_size_round_trip() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&redis_url).unwrap();
        let store = RedisBatchStore::new(client, 60);

        let user_id = Uuid::new_v4();
        let batch: Vec<ContentId> = (0..5).map(|_| Uuid::new_v4()).collect();

        store.put(user_id, 0, &batch).await.unwrap();

        assert_eq!(store.size(user_id, 0).await.unwrap(), 5);
        assert_eq!(store.get(user_id, 0).await.unwrap(), Some(batch));
        assert_eq!(store.size(user_id, 1).await.unwrap(), 0);
        assert_eq!(store.get(user_id, 1).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_put_replaces_previous_batch_entirely() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let client = create_redis_client(&redis_url).unwrap();
        let store = RedisBatchStore::new(client, 60);

        let user_id = Uuid::new_v4();
        let first: Vec<ContentId> = (0..10).map(|_| Uuid::new_v4()).collect();
        let second: Vec<ContentId> = (0..3).map(|_| Uuid::new_v4()).collect();

        store.put(user_id, 0, &first).await.unwrap();
        store.put(user_id, 0, &second).await.unwrap();

        assert_eq!(store.size(user_id, 0).await.unwrap(), 3);
        assert_eq!(store.get(user_id, 0).await.unwrap(), Some(second));
    }
}

use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppError;
use crate::error::AppResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// Product detail with rating stats, by item id
    Product(String),
    /// Popular listing, by requested length
    Popular(usize),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Product(item_id) => write!(f, "product:{}", item_id),
            CacheKey::Popular(limit) => write!(f, "popular:{}", limit),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

#[derive(Clone)]
struct Backend {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Read-through cache for query results
///
/// A disabled cache (no Redis configured) misses on every read and drops
/// every write, so callers never branch on whether caching is on.
#[derive(Clone, Default)]
pub struct Cache {
    backend: Option<Backend>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

impl Cache {
    /// Creates a Redis-backed cache and spawns its background writer
    pub async fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            backend: Some(Backend {
                redis_client,
                write_tx,
            }),
        };

        (cache, CacheWriterHandle { shutdown_tx })
    }

    /// A cache that never stores anything
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::error!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                        } else {
                            flushed += 1;
                        }
                    }

                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    /// Looks up a cached value
    ///
    /// Redis being unreachable counts as a miss: the caller falls back to the
    /// store instead of failing the request.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let Some(backend) = &self.backend else {
            return Ok(None);
        };

        let cached = match Self::read(&backend.redis_client, key).await {
            Ok(cached) => cached,
            Err(e) => {
                tracing::warn!(error = %e, key = %key, "Cache read failed, treating as miss");
                return Ok(None);
            }
        };

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                tracing::debug!(key = %key, "Cache hit");
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    async fn read(client: &Client, key: &CacheKey) -> AppResult<Option<String>> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;
        Ok(cached)
    }

    /// Drops a cached value so the next read goes to the store
    ///
    /// Runs inline rather than through the writer so the caller's next read
    /// already misses. Redis errors are logged and swallowed.
    pub async fn invalidate(&self, key: &CacheKey) {
        let Some(backend) = &self.backend else {
            return;
        };

        match Self::delete(&backend.redis_client, key).await {
            Ok(()) => tracing::debug!(key = %key, "Cache entry invalidated"),
            Err(e) => tracing::warn!(error = %e, key = %key, "Cache invalidation failed"),
        }
    }

    async fn delete(client: &Client, key: &CacheKey) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(key.to_string()).await?;
        Ok(())
    }

    /// Queues a value for writing without waiting on Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let Some(backend) = &self.backend else {
            return;
        };

        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = backend.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_product() {
        let key = CacheKey::Product("B00004ZCJE".to_string());
        assert_eq!(format!("{}", key), "product:B00004ZCJE");
    }

    #[test]
    fn test_cache_key_display_popular() {
        assert_eq!(format!("{}", CacheKey::Popular(10)), "popular:10");
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = Cache::disabled();
        assert!(!cache.is_enabled());

        let key = CacheKey::Product("i1".to_string());
        cache.set_in_background(&key, &vec!["ignored".to_string()], 60);

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_a_miss() {
        // Nothing listens on port 1
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, _handle) = Cache::new(client).await;

        let key = CacheKey::Product("i1".to_string());
        let retrieved: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, None);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server (REDIS_URL)"]
    async fn test_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone()).await;

        let key = CacheKey::Popular(3);
        let value = vec!["i1".to_string(), "i2".to_string()];
        cache.set_in_background(&key, &value, 60);

        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requires a running Redis server (REDIS_URL)"]
    async fn test_invalidate_removes_cached_value() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, _handle) = Cache::new(client.clone()).await;

        let key = CacheKey::Product("invalidate-me".to_string());
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.set_ex(key.to_string(), "\"stale\"", 60).await.unwrap();

        let cached: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(cached.as_deref(), Some("stale"));

        cache.invalidate(&key).await;

        let cached: Option<String> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(cached, None);
    }

    #[tokio::test]
    async fn test_invalidate_on_disabled_cache_is_noop() {
        Cache::disabled()
            .invalidate(&CacheKey::Product("i1".to_string()))
            .await;
    }
}

use anyhow::Result;
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands};
use tracing::debug;

use super::{KvStore, StoreError};

/// Key-value store backed by Redis string keys.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: MultiplexedConnection,
}

impl RedisKvStore {
    pub async fn connect(client: &redis::Client) -> Result<Self> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(StoreError::Kv)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await.map_err(StoreError::Kv)?;
        debug!("kv get {key}: {}", if value.is_some() { "hit" } else { "miss" });
        Ok(value)
    }

    async fn list(&self, pattern: &str) -> Result<Vec<(String, String)>> {
        let mut keys: Vec<String> = Vec::new();
        {
            let mut scan_conn = self.conn.clone();
            let mut iter = scan_conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(StoreError::Kv)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        keys.sort();
        keys.dedup();

        let mut conn = self.conn.clone();
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            // Keys may expire between SCAN and GET.
            let value: Option<String> = conn.get(&key).await.map_err(StoreError::Kv)?;
            if let Some(value) = value {
                entries.push((key, value));
            }
        }
        debug!("kv list {pattern}: {} entries", entries.len());
        Ok(entries)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use redis::{Client, aio::MultiplexedConnection};

use crate::application::services::delivery_cache::DeliveryCache;

/// Writes delivery records as `SET key <rfc3339> PX <ttl>`.
#[derive(Clone)]
pub struct RedisDeliveryCache {
    conn: MultiplexedConnection,
}

impl RedisDeliveryCache {
    pub async fn connect(url: &str) -> redis::RedisResult<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl DeliveryCache for RedisDeliveryCache {
    async fn record(&self, key: &str, sent_at: DateTime<Utc>, ttl: Duration) -> anyhow::Result<()> {
        // PX 0 is rejected by redis
        let ttl_ms = ttl.as_millis().max(1) as u64;
        redis::cmd("SET")
            .arg(key)
            .arg(sent_at.to_rfc3339_opts(SecondsFormat::Nanos, true))
            .arg("PX")
            .arg(ttl_ms)
            .query_async::<_, ()>(&mut self.conn.clone())
            .await?;
        Ok(())
    }
}

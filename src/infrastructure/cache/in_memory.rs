use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tokio::{sync::RwLock, time::Instant};

use crate::application::services::delivery_cache::DeliveryCache;

/// Expiring key/value map with the same value encoding as the redis cache.
#[derive(Default)]
pub struct InMemoryDeliveryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryDeliveryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|(_, expires_at)| *expires_at > Instant::now())
            .map(|(value, _)| value.clone())
    }
}

#[async_trait]
impl DeliveryCache for InMemoryDeliveryCache {
    async fn record(&self, key: &str, sent_at: DateTime<Utc>, ttl: Duration) -> anyhow::Result<()> {
        let value = sent_at.to_rfc3339_opts(SecondsFormat::Nanos, true);
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > Instant::now());
        entries.insert(key.to_string(), (value, Instant::now() + ttl));
        Ok(())
    }
}

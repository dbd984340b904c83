use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Auxiliary "provider reference -> sent time" index. Dispatch only writes to
/// it and never reads it back.
#[async_trait]
pub trait DeliveryCache: Send + Sync {
    async fn record(&self, key: &str, sent_at: DateTime<Utc>, ttl: Duration) -> anyhow::Result<()>;
}

pub fn delivery_key(provider_reference: &str) -> String {
    format!("message:{provider_reference}")
}

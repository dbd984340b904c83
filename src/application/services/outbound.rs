use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::DeliveryError;

/// Payload posted to the outbound provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub to: String,
    pub content: String,
}

#[async_trait]
pub trait OutboundTransport: Send + Sync {
    /// Delivers one message and returns the provider's reference for it.
    async fn send(&self, request: &SendRequest) -> Result<String, DeliveryError>;
}

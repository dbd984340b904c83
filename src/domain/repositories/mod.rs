use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{errors::DomainError, models::Message};

/// Durable message state as seen by the creation, listing and dispatch paths.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn insert_message(&self, message: &Message) -> Result<(), DomainError>;

    /// Sent messages, newest `sent_at` first.
    async fn list_sent(&self, limit: u32, offset: u32) -> Result<Vec<Message>, DomainError>;

    /// Leases up to `limit` pending messages, oldest first. The lease only
    /// lasts for the claiming transaction; rows leased by a concurrent claim
    /// are skipped rather than waited on.
    async fn claim_batch(&self, limit: usize) -> Result<Vec<Message>, DomainError>;

    /// Pending -> Sent. Returns [`DomainError::Conflict`] when the message is
    /// not pending (already sent or unknown).
    async fn mark_sent(
        &self,
        id: Uuid,
        provider_reference: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DomainError>;

    async fn increment_attempt(&self, id: Uuid, last_error: &str) -> Result<(), DomainError>;
}

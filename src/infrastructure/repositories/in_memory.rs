use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Message, MessageStatus},
    repositories::MessageStore,
};

type LeaseSet = Arc<Mutex<HashSet<Uuid>>>;

/// Process-local store. Claims take a per-row lease for the duration of the
/// claim, and concurrent claims skip leased rows instead of waiting on them.
#[derive(Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<Uuid, Message>>>,
    leases: LeaseSet,
    lease_hold: Option<Duration>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps leases held for `hold` before a claim returns, the way a slow
    /// claiming transaction would.
    pub fn with_lease_hold(hold: Duration) -> Self {
        Self {
            lease_hold: Some(hold),
            ..Self::default()
        }
    }

    pub async fn get(&self, id: Uuid) -> Option<Message> {
        self.messages.read().await.get(&id).cloned()
    }

    pub async fn count_by_status(&self, status: MessageStatus) -> usize {
        self.messages
            .read()
            .await
            .values()
            .filter(|m| m.status == status)
            .count()
    }
}

/// Releases its leases on drop, so a cancelled claim never strands rows.
struct Lease {
    leases: LeaseSet,
    ids: Vec<Uuid>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        for id in &self.ids {
            leases.remove(id);
        }
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn insert_message(&self, message: &Message) -> Result<(), DomainError> {
        let mut messages = self.messages.write().await;
        if messages.contains_key(&message.id) {
            return Err(DomainError::Conflict(format!(
                "message {} already exists",
                message.id
            )));
        }
        messages.insert(message.id, message.clone());
        Ok(())
    }

    async fn list_sent(&self, limit: u32, offset: u32) -> Result<Vec<Message>, DomainError> {
        let messages = self.messages.read().await;
        let mut sent: Vec<&Message> = messages.values().filter(|m| m.is_sent()).collect();
        // Some(_) sorts above None, so descending order keeps nulls last
        sent.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        Ok(sent
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn claim_batch(&self, limit: usize) -> Result<Vec<Message>, DomainError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let messages = self.messages.read().await;
        let (claimed, _lease) = {
            let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
            let mut pending: Vec<&Message> = messages
                .values()
                .filter(|m| m.status == MessageStatus::Pending && !leases.contains(&m.id))
                .collect();
            pending.sort_by_key(|m| (m.created_at, m.id));
            pending.truncate(limit);

            let ids: Vec<Uuid> = pending.iter().map(|m| m.id).collect();
            leases.extend(ids.iter().copied());
            let claimed: Vec<Message> = pending.into_iter().cloned().collect();
            (
                claimed,
                Lease {
                    leases: self.leases.clone(),
                    ids,
                },
            )
        };
        drop(messages);

        if let Some(hold) = self.lease_hold {
            tokio::time::sleep(hold).await;
        }
        Ok(claimed)
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        provider_reference: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let mut messages = self.messages.write().await;
        match messages.get_mut(&id) {
            Some(message) if message.status == MessageStatus::Pending => {
                message.status = MessageStatus::Sent;
                message.sent_at = Some(sent_at);
                message.provider_reference = Some(provider_reference.to_string());
                message.last_error = None;
                message.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DomainError::Conflict(format!("message {id} is not pending"))),
        }
    }

    async fn increment_attempt(&self, id: Uuid, last_error: &str) -> Result<(), DomainError> {
        let mut messages = self.messages.write().await;
        if let Some(message) = messages.get_mut(&id) {
            message.attempt_count += 1;
            message.last_error = Some(last_error.to_string());
            message.updated_at = Utc::now();
        }
        Ok(())
    }
}

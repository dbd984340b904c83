use std::sync::Arc;

use tracing::{info, warn};

use crate::domain::{errors::DomainError, models::Message, repositories::MessageStore};

pub struct CreateMessageUseCase {
    store: Arc<dyn MessageStore>,
}

pub struct CreateMessageRequest {
    pub to: String,
    pub content: String,
}

impl CreateMessageUseCase {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Validates and stores a pending message; delivery happens on a later tick.
    pub async fn execute(&self, request: CreateMessageRequest) -> Result<Message, DomainError> {
        let message = Message::new(request.to, request.content).inspect_err(|err| {
            warn!(error = %err, "create message: validation error");
        })?;

        self.store.insert_message(&message).await?;
        info!(message_id = %message.id, "create message: stored");

        Ok(message)
    }
}

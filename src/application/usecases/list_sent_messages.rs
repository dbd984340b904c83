use std::sync::Arc;

use crate::domain::{errors::DomainError, models::Message, repositories::MessageStore};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;

pub struct ListSentMessagesUseCase {
    store: Arc<dyn MessageStore>,
}

impl ListSentMessagesUseCase {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// Non-positive or missing limits fall back to [`DEFAULT_PAGE_SIZE`];
    /// negative offsets start from the beginning.
    pub async fn execute(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Message>, DomainError> {
        let limit = match limit {
            Some(limit) if limit > 0 => limit.min(MAX_PAGE_SIZE as i64) as u32,
            _ => DEFAULT_PAGE_SIZE,
        };
        let offset = offset.unwrap_or(0).clamp(0, u32::MAX as i64) as u32;

        self.store.list_sent(limit, offset).await
    }
}

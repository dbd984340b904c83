use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// Upper bound on message content, counted in characters.
pub const MAX_CONTENT_LENGTH: usize = 140;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Sent,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(MessageStatus::Pending),
            "sent" => Some(MessageStatus::Sent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub recipient: String,
    pub content: String,
    pub status: MessageStatus,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub provider_reference: Option<String>,
}

impl Message {
    /// Builds a fresh pending message, rejecting content over
    /// [`MAX_CONTENT_LENGTH`] characters.
    pub fn new(recipient: impl Into<String>, content: impl Into<String>) -> Result<Self, DomainError> {
        let recipient = recipient.into();
        let content = content.into();

        let length = content.chars().count();
        if length > MAX_CONTENT_LENGTH {
            return Err(DomainError::Validation(format!(
                "content exceeds {MAX_CONTENT_LENGTH} characters (got {length})"
            )));
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            recipient,
            content,
            status: MessageStatus::Pending,
            attempt_count: 0,
            created_at: now,
            updated_at: now,
            sent_at: None,
            last_error: None,
            provider_reference: None,
        })
    }

    pub fn is_sent(&self) -> bool {
        self.status == MessageStatus::Sent
    }
}

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Persistence failure: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failure of a single delivery to the outbound provider.
///
/// Every variant is retried identically by the transport; the split only
/// matters for logs and for the error text stored on the message.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
    #[error("unexpected status {actual}, expected {expected}")]
    UnexpectedStatus { expected: u16, actual: u16 },
    #[error("undecodable provider response: {0}")]
    Decode(String),
    #[error("provider response carried no message id")]
    MissingProviderId,
}

impl DeliveryError {
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            DeliveryError::UnexpectedStatus { .. }
                | DeliveryError::Decode(_)
                | DeliveryError::MissingProviderId
        )
    }
}

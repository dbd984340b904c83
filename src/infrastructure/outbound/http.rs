use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{
    application::services::outbound::{OutboundTransport, SendRequest},
    domain::errors::DeliveryError,
};

#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub url: String,
    /// Per attempt.
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub expect_status: u16,
    pub auth_header: Option<String>,
    pub auth_value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "messageId", default)]
    message_id: Option<String>,
}

/// Posts messages to a webhook-style provider, retrying every failure with
/// linear backoff.
pub struct HttpTransport {
    config: HttpTransportConfig,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("message-dispatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    async fn try_send(&self, request: &SendRequest) -> Result<String, DeliveryError> {
        let mut builder = self
            .client
            .post(&self.config.url)
            .timeout(self.config.timeout)
            .json(request);
        if let (Some(header), Some(value)) = (&self.config.auth_header, &self.config.auth_value) {
            builder = builder.header(header.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if status.as_u16() != self.config.expect_status {
            return Err(DeliveryError::UnexpectedStatus {
                expected: self.config.expect_status,
                actual: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        let decoded: ProviderResponse =
            serde_json::from_slice(&body).map_err(|err| DeliveryError::Decode(err.to_string()))?;

        match decoded.message_id {
            Some(id) if !id.trim().is_empty() => {
                debug!(message_id = %id, reply = ?decoded.message, "provider accepted");
                Ok(id)
            }
            _ => Err(DeliveryError::MissingProviderId),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::Timeout(self.config.timeout)
        } else {
            DeliveryError::Transport(Box::new(err))
        }
    }
}

#[async_trait]
impl OutboundTransport for HttpTransport {
    async fn send(&self, request: &SendRequest) -> Result<String, DeliveryError> {
        retry_with_linear_backoff(self.config.max_retries, self.config.retry_base_delay, || {
            self.try_send(request)
        })
        .await
    }
}

/// Delay after failed attempt `attempt` (1-based). Saturates instead of
/// overflowing.
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.checked_mul(attempt).unwrap_or(Duration::MAX)
}

/// Runs `op` up to `attempts` times, sleeping `k * base` after failed attempt
/// `k`. Nothing sleeps after the final attempt.
async fn retry_with_linear_backoff<T, F, Fut>(
    attempts: u32,
    base: Duration,
    mut op: F,
) -> Result<T, DeliveryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeliveryError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                warn!(attempt, error = %err, "send failed, giving up");
                return Err(err);
            }
            Err(err) => {
                let delay = backoff_delay(base, attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    protocol = err.is_protocol(),
                    error = %err,
                    "send failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

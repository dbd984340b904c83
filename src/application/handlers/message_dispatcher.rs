use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::{
    application::services::{
        delivery_cache::{DeliveryCache, delivery_key},
        outbound::{OutboundTransport, SendRequest},
        stop_signal::StopSignal,
    },
    domain::{errors::DomainError, models::Message, repositories::MessageStore},
};

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub batch_size: usize,
    pub cache_ttl: Duration,
}

/// Outcome counters of one tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub claimed: usize,
    pub sent: usize,
    pub failed: usize,
    /// Delivered, but the Sent transition could not be stored.
    pub unrecorded: usize,
    /// Claimed, but left pending because a stop was requested.
    pub skipped: usize,
}

pub struct MessageDispatchHandler {
    store: Arc<dyn MessageStore>,
    transport: Arc<dyn OutboundTransport>,
    cache: Option<Arc<dyn DeliveryCache>>,
    config: DispatchConfig,
}

impl MessageDispatchHandler {
    pub fn new(
        store: Arc<dyn MessageStore>,
        transport: Arc<dyn OutboundTransport>,
        cache: Option<Arc<dyn DeliveryCache>>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            store,
            transport,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Claims one batch and delivers it sequentially, in claim order.
    ///
    /// The stop signal is checked before every message; whatever is left
    /// when it fires stays pending for a later tick.
    pub async fn tick(&self, stop: &StopSignal) -> TickReport {
        let mut report = TickReport::default();

        let messages = match self.store.claim_batch(self.config.batch_size).await {
            Ok(messages) => messages,
            Err(err) => {
                error!(error = %err, "claim batch failed, skipping tick");
                return report;
            }
        };
        report.claimed = messages.len();
        if messages.is_empty() {
            debug!("tick: no pending messages");
            return report;
        }

        info!(count = messages.len(), "tick: processing claimed messages");
        for (index, message) in messages.iter().enumerate() {
            if stop.is_cancelled() {
                report.skipped = messages.len() - index;
                info!(
                    skipped = report.skipped,
                    reason = stop.reason().unwrap_or("parent cancelled"),
                    "tick: stop requested, leaving remaining messages pending"
                );
                break;
            }
            self.dispatch(message, &mut report).await;
        }

        report
    }

    async fn dispatch(&self, message: &Message, report: &mut TickReport) {
        let request = SendRequest {
            to: message.recipient.clone(),
            content: message.content.clone(),
        };

        debug!(message_id = %message.id, to = %message.recipient, "tick: sending message");
        let provider_reference = match self.transport.send(&request).await {
            Ok(reference) => reference,
            Err(err) => {
                report.failed += 1;
                warn!(
                    message_id = %message.id,
                    attempt = message.attempt_count + 1,
                    protocol = err.is_protocol(),
                    error = %err,
                    "tick: delivery failed"
                );
                if let Err(store_err) = self.store.increment_attempt(message.id, &err.to_string()).await {
                    error!(message_id = %message.id, error = %store_err, "tick: increment attempt failed");
                }
                return;
            }
        };

        let sent_at = Utc::now();
        if let Err(err) = self
            .store
            .mark_sent(message.id, &provider_reference, sent_at)
            .await
        {
            // Delivered but still pending: the next tick will deliver it again.
            report.unrecorded += 1;
            match err {
                DomainError::Conflict(_) => warn!(
                    message_id = %message.id,
                    provider_reference = %provider_reference,
                    error = %err,
                    "tick: message was no longer pending"
                ),
                _ => error!(
                    message_id = %message.id,
                    provider_reference = %provider_reference,
                    error = %err,
                    "tick: mark sent failed"
                ),
            }
            return;
        }
        report.sent += 1;
        info!(message_id = %message.id, provider_reference = %provider_reference, "tick: message sent");

        if let Some(cache) = &self.cache {
            let key = delivery_key(&provider_reference);
            if let Err(err) = cache.record(&key, sent_at, self.config.cache_ttl).await {
                warn!(message_id = %message.id, key = %key, error = %err, "tick: cache record failed");
            }
        }
    }
}

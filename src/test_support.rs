//! Fakes for the dispatch capability traits.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use poem::Route;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    application::{
        handlers::message_dispatcher::{DispatchConfig, MessageDispatchHandler},
        services::{
            delivery_cache::DeliveryCache,
            dispatch_scheduler::DispatchScheduler,
            outbound::{OutboundTransport, SendRequest},
        },
        usecases::{
            create_message::CreateMessageUseCase, list_sent_messages::ListSentMessagesUseCase,
        },
    },
    domain::{
        errors::{DeliveryError, DomainError},
        models::Message,
        repositories::MessageStore,
    },
    infrastructure::repositories::in_memory::InMemoryMessageStore,
    presentation::http::{build_app, endpoints::root::ApiState},
};

/// In-memory store with switchable failures and call counters.
#[derive(Default)]
pub struct FakeStore {
    pub inner: InMemoryMessageStore,
    pub fail_claim: AtomicBool,
    pub fail_mark_sent: AtomicBool,
    pub fail_increment: AtomicBool,
    pub claim_calls: AtomicUsize,
    pub mark_sent_calls: AtomicUsize,
    pub increment_calls: AtomicUsize,
}

impl FakeStore {
    /// Seeds `count` pending messages, one second apart, oldest first.
    pub async fn seeded(count: usize) -> (Self, Vec<Uuid>) {
        let store = Self::default();
        let base = Utc::now() - ChronoDuration::minutes(5);
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let mut message = Message::new(format!("+90555{i:07}"), format!("message {i}")).unwrap();
            message.created_at = base + ChronoDuration::seconds(i as i64);
            store.inner.insert_message(&message).await.unwrap();
            ids.push(message.id);
        }
        (store, ids)
    }

    fn failure() -> DomainError {
        DomainError::Persistence(sqlx::Error::PoolTimedOut)
    }
}

#[async_trait]
impl MessageStore for FakeStore {
    async fn insert_message(&self, message: &Message) -> Result<(), DomainError> {
        self.inner.insert_message(message).await
    }

    async fn list_sent(&self, limit: u32, offset: u32) -> Result<Vec<Message>, DomainError> {
        self.inner.list_sent(limit, offset).await
    }

    async fn claim_batch(&self, limit: usize) -> Result<Vec<Message>, DomainError> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_claim.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        self.inner.claim_batch(limit).await
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        provider_reference: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.mark_sent_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_mark_sent.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        self.inner.mark_sent(id, provider_reference, sent_at).await
    }

    async fn increment_attempt(&self, id: Uuid, last_error: &str) -> Result<(), DomainError> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_increment.load(Ordering::SeqCst) {
            return Err(Self::failure());
        }
        self.inner.increment_attempt(id, last_error).await
    }
}

type SendHook = Box<dyn Fn(usize) + Send + Sync>;

/// Transport that replays queued outcomes, then succeeds with
/// `provider-{n}` once the queue is empty.
#[derive(Default)]
pub struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<String, DeliveryError>>>,
    sent: Mutex<Vec<SendRequest>>,
    on_send: Option<SendHook>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outcomes(outcomes: impl IntoIterator<Item = Result<String, DeliveryError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Runs `hook` with the 1-based call number before each send resolves.
    pub fn on_send(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_send = Some(Box::new(hook));
        self
    }

    pub fn sent(&self) -> Vec<SendRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl OutboundTransport for ScriptedTransport {
    async fn send(&self, request: &SendRequest) -> Result<String, DeliveryError> {
        let call = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(request.clone());
            sent.len()
        };
        if let Some(hook) = &self.on_send {
            hook(call);
        }
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(format!("provider-{call}")))
    }
}

#[derive(Default)]
pub struct RecordingCache {
    pub fail: bool,
    records: Mutex<Vec<(String, DateTime<Utc>, Duration)>>,
}

impl RecordingCache {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<(String, DateTime<Utc>, Duration)> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryCache for RecordingCache {
    async fn record(&self, key: &str, sent_at: DateTime<Utc>, ttl: Duration) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("cache unavailable");
        }
        self.records
            .lock()
            .unwrap()
            .push((key.to_string(), sent_at, ttl));
        Ok(())
    }
}

/// HTTP app over `store`, with a scripted transport and a one-minute interval.
pub fn test_app(store: FakeStore) -> (Route, Arc<FakeStore>, Arc<DispatchScheduler>) {
    let store = Arc::new(store);
    let handler = MessageDispatchHandler::new(
        store.clone(),
        Arc::new(ScriptedTransport::new()),
        None,
        DispatchConfig {
            batch_size: 2,
            cache_ttl: Duration::from_secs(60),
        },
    );
    let scheduler = Arc::new(DispatchScheduler::new(
        Arc::new(handler),
        Duration::from_secs(60),
    ));
    let state = Arc::new(ApiState {
        create_message_usecase: Arc::new(CreateMessageUseCase::new(store.clone())),
        list_sent_usecase: Arc::new(ListSentMessagesUseCase::new(store.clone())),
        scheduler: scheduler.clone(),
        root: CancellationToken::new(),
    });

    (
        build_app(state, "http://localhost:8080", false),
        store,
        scheduler,
    )
}

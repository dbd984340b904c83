//! Runs against a live Postgres when `DATABASE_URL` is set; skipped otherwise.
//! Everything happens in a throwaway schema that is dropped afterwards.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use message_dispatch::{
    domain::{
        errors::DomainError,
        models::{Message, MessageStatus},
        repositories::MessageStore,
    },
    infrastructure::repositories::postgres::PostgresMessageStore,
};
use sqlx::{
    Connection, Executor, PgConnection,
    postgres::{PgConnectOptions, PgPoolOptions},
};
use uuid::Uuid;

struct TestDb {
    url: String,
    schema: String,
    store: Arc<PostgresMessageStore>,
}

impl TestDb {
    async fn connect() -> Option<Self> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping postgres tests");
            return None;
        };

        let schema = format!("dispatch_test_{}", Uuid::new_v4().simple());
        let mut admin = PgConnection::connect(&url).await.unwrap();
        admin
            .execute(format!("CREATE SCHEMA {schema}").as_str())
            .await
            .unwrap();
        admin.close().await.unwrap();

        let options = PgConnectOptions::from_str(&url)
            .unwrap()
            .options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .unwrap();
        let store = PostgresMessageStore::new(pool);
        store.migrate().await.unwrap();

        Some(Self { url, schema, store })
    }

    async fn seed(&self, count: usize) -> Vec<Uuid> {
        let base = Utc::now() - Duration::minutes(10);
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            let mut message =
                Message::new(format!("+9055500000{i:02}"), format!("body {i}")).unwrap();
            message.created_at = base + Duration::seconds(i as i64);
            message.updated_at = message.created_at;
            self.store.insert_message(&message).await.unwrap();
            ids.push(message.id);
        }
        ids
    }

    async fn drop_schema(self) {
        self.store.pool().close().await;
        let mut admin = PgConnection::connect(&self.url).await.unwrap();
        admin
            .execute(format!("DROP SCHEMA {} CASCADE", self.schema).as_str())
            .await
            .unwrap();
    }
}

fn ids(messages: &[Message]) -> Vec<Uuid> {
    messages.iter().map(|m| m.id).collect()
}

#[tokio::test]
async fn postgres_store_contract() {
    let Some(db) = TestDb::connect().await else {
        return;
    };
    let store = db.store.clone();
    let seeded = db.seed(5).await;

    // oldest first, bounded, and the lease ends with the claim
    let claimed = store.claim_batch(2).await.unwrap();
    assert_eq!(ids(&claimed), seeded[..2]);
    assert!(claimed.iter().all(|m| m.status == MessageStatus::Pending));
    assert_eq!(ids(&store.claim_batch(2).await.unwrap()), seeded[..2]);
    assert!(store.claim_batch(0).await.unwrap().is_empty());
    assert_eq!(store.claim_batch(50).await.unwrap().len(), 5);

    // a row locked by another transaction is skipped, not waited on
    let mut holder = store.pool().begin().await.unwrap();
    sqlx::query("SELECT id FROM messages WHERE id = $1 FOR UPDATE")
        .bind(seeded[0])
        .execute(&mut *holder)
        .await
        .unwrap();
    let claimed = store.claim_batch(2).await.unwrap();
    assert_eq!(ids(&claimed), seeded[1..3]);
    holder.rollback().await.unwrap();

    // failed attempts accumulate and keep the message pending
    store.increment_attempt(seeded[1], "unexpected status 500, expected 202").await.unwrap();
    store.increment_attempt(seeded[1], "timeout").await.unwrap();
    let claimed = store.claim_batch(2).await.unwrap();
    let retried = claimed.iter().find(|m| m.id == seeded[1]).unwrap();
    assert_eq!(retried.attempt_count, 2);
    assert_eq!(retried.last_error.as_deref(), Some("timeout"));

    // mark sent is conditional on pending
    let first_sent_at = Utc::now() - Duration::seconds(30);
    store.mark_sent(seeded[0], "mid-0", first_sent_at).await.unwrap();
    let err = store.mark_sent(seeded[0], "mid-again", Utc::now()).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));
    let err = store.mark_sent(Uuid::new_v4(), "mid", Utc::now()).await.unwrap_err();
    assert!(matches!(err, DomainError::Conflict(_)));

    store.mark_sent(seeded[1], "mid-1", Utc::now()).await.unwrap();
    let pending = store.claim_batch(10).await.unwrap();
    assert_eq!(ids(&pending), seeded[2..]);

    // newest sent first, with pagination
    let sent = store.list_sent(10, 0).await.unwrap();
    assert_eq!(ids(&sent), vec![seeded[1], seeded[0]]);
    assert_eq!(sent[0].last_error, None);
    assert_eq!(sent[1].provider_reference.as_deref(), Some("mid-0"));
    assert_eq!(
        sent[1].sent_at.map(|at| at.timestamp_micros()),
        Some(first_sent_at.timestamp_micros())
    );
    assert_eq!(ids(&store.list_sent(1, 1).await.unwrap()), vec![seeded[0]]);

    // duplicate ids are rejected by the primary key
    let duplicate = sent[0].clone();
    assert!(matches!(
        store.insert_message(&duplicate).await,
        Err(DomainError::Persistence(_))
    ));

    drop(store);
    db.drop_schema().await;
}

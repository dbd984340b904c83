use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, postgres::PgPoolOptions};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::{
    errors::DomainError,
    models::{Message, MessageStatus},
    repositories::MessageStore,
};

pub type PgPool = Pool<Postgres>;

const MESSAGE_COLUMNS: &str = "id, recipient, content, status, attempt_count, created_at, \
     updated_at, sent_at, last_error, provider_reference";

#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: PgPool,
}

impl PostgresMessageStore {
    pub fn new(pool: PgPool) -> Arc<Self> {
        Arc::new(Self { pool })
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Arc<Self>, DomainError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations from `migrations/`.
    pub async fn migrate(&self) -> Result<(), DomainError> {
        sqlx::migrate!()
            .run(&self.pool)
            .await
            .map_err(sqlx::Error::from)?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MessageStore for PostgresMessageStore {
    async fn insert_message(&self, message: &Message) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO messages (
                id, recipient, content, status, attempt_count, created_at, updated_at
            )
            VALUES ($1,$2,$3,$4,$5,$6,$7)
            "#,
        )
        .bind(message.id)
        .bind(&message.recipient)
        .bind(&message.content)
        .bind(message.status.as_str())
        .bind(message.attempt_count as i32)
        .bind(message.created_at)
        .bind(message.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_sent(&self, limit: u32, offset: u32) -> Result<Vec<Message>, DomainError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE status = 'sent'
            ORDER BY sent_at DESC NULLS LAST
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn claim_batch(&self, limit: usize) -> Result<Vec<Message>, DomainError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // Row locks live only as long as this transaction; rows locked by a
        // concurrent claim are skipped instead of waited on.
        let mut tx = self.pool.begin().await?;
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM messages
            WHERE status = 'pending'
            ORDER BY created_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#
        ))
        .bind(limit as i64)
        .fetch_all(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(requested = limit, claimed = records.len(), "claim batch");
        records.into_iter().map(Message::try_from).collect()
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        provider_reference: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET status = 'sent',
                sent_at = $2,
                provider_reference = $3,
                last_error = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND status = 'pending'
            "#,
        )
        .bind(id)
        .bind(sent_at)
        .bind(provider_reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(message_id = %id, "mark sent: no pending row updated");
            return Err(DomainError::Conflict(format!("message {id} is not pending")));
        }
        Ok(())
    }

    async fn increment_attempt(&self, id: Uuid, last_error: &str) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE messages
            SET attempt_count = attempt_count + 1,
                last_error = $2,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(last_error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    recipient: String,
    content: String,
    status: String,
    attempt_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    provider_reference: Option<String>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = DomainError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let status = MessageStatus::parse(&value.status)
            .ok_or_else(|| anyhow::anyhow!("unknown message status {}", value.status))?;
        let attempt_count = u32::try_from(value.attempt_count)
            .map_err(|_| anyhow::anyhow!("negative attempt count {}", value.attempt_count))?;

        Ok(Message {
            id: value.id,
            recipient: value.recipient,
            content: value.content,
            status,
            attempt_count,
            created_at: value.created_at,
            updated_at: value.updated_at,
            sent_at: value.sent_at,
            last_error: value.last_error,
            provider_reference: value.provider_reference,
        })
    }
}

use std::sync::Arc;

use application::repository::{MessageRepository, ThreadRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    ChatThread, ListingId, Message, MessageContent, MessageId, RepositoryError, ThreadId,
    ThreadKey, Timestamp, UserId,
};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

pub(crate) fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &err {
        // 唯一约束冲突交给调用方处理（会话解析器会重新查询）
        if db.is_unique_violation() {
            return RepositoryError::conflict(db.message().to_string());
        }
    }
    if matches!(err, sqlx::Error::RowNotFound) {
        return RepositoryError::NotFound;
    }
    RepositoryError::storage_with_source(err.to_string(), err)
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct ThreadRecord {
    id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    listing_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    last_message_at: Option<DateTime<Utc>>,
}

impl TryFrom<ThreadRecord> for ChatThread {
    type Error = RepositoryError;

    fn try_from(value: ThreadRecord) -> Result<Self, Self::Error> {
        if value.buyer_id == value.seller_id {
            return Err(invalid_data(format!(
                "chat thread {} has identical participants",
                value.id
            )));
        }

        Ok(ChatThread {
            id: ThreadId::from(value.id),
            buyer_id: UserId::from(value.buyer_id),
            seller_id: UserId::from(value.seller_id),
            listing_id: value.listing_id.map(ListingId::from),
            created_at: value.created_at,
            last_message_at: value.last_message_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    id: Uuid,
    chat_id: Uuid,
    content: String,
    sender_id: Uuid,
    receiver_id: Uuid,
    listing_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    is_read: bool,
    updated_at: Option<DateTime<Utc>>,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let content =
            MessageContent::new(value.content).map_err(|err| invalid_data(err.to_string()))?;

        Ok(Message {
            id: MessageId::from(value.id),
            chat_id: ThreadId::from(value.chat_id),
            content,
            sender_id: UserId::from(value.sender_id),
            receiver_id: UserId::from(value.receiver_id),
            listing_id: value.listing_id.map(ListingId::from),
            created_at: value.created_at,
            is_read: value.is_read,
            updated_at: value.updated_at,
        })
    }
}

const THREAD_COLUMNS: &str = "id, buyer_id, seller_id, listing_id, created_at, last_message_at";
const MESSAGE_COLUMNS: &str =
    "id, chat_id, content, sender_id, receiver_id, listing_id, created_at, is_read, updated_at";

#[derive(Clone)]
pub struct PgThreadRepository {
    pool: PgPool,
}

impl PgThreadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThreadRepository for PgThreadRepository {
    async fn find_by_key(&self, key: ThreadKey) -> Result<Option<ChatThread>, RepositoryError> {
        let record = sqlx::query_as::<_, ThreadRecord>(&format!(
            r#"
            SELECT {THREAD_COLUMNS}
            FROM chat_threads
            WHERE buyer_id = $1 AND seller_id = $2 AND listing_id IS NOT DISTINCT FROM $3
            "#
        ))
        .bind(Uuid::from(key.buyer_id))
        .bind(Uuid::from(key.seller_id))
        .bind(key.listing_id.map(Uuid::from))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(ChatThread::try_from).transpose()
    }

    async fn find_by_id(&self, id: ThreadId) -> Result<Option<ChatThread>, RepositoryError> {
        let record = sqlx::query_as::<_, ThreadRecord>(&format!(
            "SELECT {THREAD_COLUMNS} FROM chat_threads WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(ChatThread::try_from).transpose()
    }

    async fn create(&self, thread: ChatThread) -> Result<ChatThread, RepositoryError> {
        let record = sqlx::query_as::<_, ThreadRecord>(&format!(
            r#"
            INSERT INTO chat_threads (id, buyer_id, seller_id, listing_id, created_at, last_message_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {THREAD_COLUMNS}
            "#
        ))
        .bind(Uuid::from(thread.id))
        .bind(Uuid::from(thread.buyer_id))
        .bind(Uuid::from(thread.seller_id))
        .bind(thread.listing_id.map(Uuid::from))
        .bind(thread.created_at)
        .bind(thread.last_message_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        ChatThread::try_from(record)
    }

    async fn list_inbox(
        &self,
        user_id: UserId,
        take: u32,
        skip: u32,
    ) -> Result<Vec<ChatThread>, RepositoryError> {
        let records = sqlx::query_as::<_, ThreadRecord>(&format!(
            r#"
            SELECT {THREAD_COLUMNS}
            FROM chat_threads
            WHERE buyer_id = $1 OR seller_id = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(Uuid::from(user_id))
        .bind(i64::from(take))
        .bind(i64::from(skip))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(ChatThread::try_from).collect()
    }
}

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn append(&self, message: Message) -> Result<Message, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            INSERT INTO chat_messages (id, chat_id, content, sender_id, receiver_id, listing_id, created_at, is_read, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::from(message.id))
        .bind(Uuid::from(message.chat_id))
        .bind(message.content.as_str())
        .bind(Uuid::from(message.sender_id))
        .bind(Uuid::from(message.receiver_id))
        .bind(message.listing_id.map(Uuid::from))
        .bind(message.created_at)
        .bind(message.is_read)
        .bind(message.updated_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        // 并发发送可能乱序提交，last_message_at 只前进
        let touched = sqlx::query(
            r#"
            UPDATE chat_threads
            SET last_message_at = GREATEST(COALESCE(last_message_at, $2), $2)
            WHERE id = $1
            "#,
        )
        .bind(record.chat_id)
        .bind(record.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;
        if touched.rows_affected() == 0 {
            // tx 被丢弃时回滚
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Message::try_from(record)
    }

    async fn update(&self, message: Message) -> Result<Message, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            UPDATE chat_messages
            SET content = $2, updated_at = $3
            WHERE id = $1
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(Uuid::from(message.id))
        .bind(message.content.as_str())
        .bind(message.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?
        .ok_or(RepositoryError::NotFound)?;

        Message::try_from(record)
    }

    async fn remove(&self, id: MessageId) -> Result<(), RepositoryError> {
        let result = sqlx::query(r#"DELETE FROM chat_messages WHERE id = $1"#)
            .bind(Uuid::from(id))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_by_id(&self, id: MessageId) -> Result<Option<Message>, RepositoryError> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE id = $1"
        ))
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        record.map(Message::try_from).transpose()
    }

    async fn list_for_chat(
        &self,
        chat_id: ThreadId,
        take: u32,
        before: Option<Timestamp>,
    ) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS}
            FROM chat_messages
            WHERE chat_id = $1
              AND ($3::timestamptz IS NULL OR created_at < $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        ))
        .bind(Uuid::from(chat_id))
        .bind(i64::from(take))
        .bind(before)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }

    async fn mark_read_up_to(
        &self,
        chat_id: ThreadId,
        reader_id: UserId,
        up_to: Timestamp,
    ) -> Result<u64, RepositoryError> {
        // 条件更新本身就是幂等的，并发重复请求最多多扫描一次
        let result = sqlx::query(
            r#"
            UPDATE chat_messages
            SET is_read = TRUE
            WHERE chat_id = $1
              AND receiver_id = $2
              AND is_read = FALSE
              AND created_at <= $3
            "#,
        )
        .bind(Uuid::from(chat_id))
        .bind(Uuid::from(reader_id))
        .bind(up_to)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, receiver_id: UserId) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM chat_messages WHERE receiver_id = $1 AND is_read = FALSE"#,
        )
        .bind(Uuid::from(receiver_id))
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        u64::try_from(count).map_err(|err| invalid_data(err.to_string()))
    }

    async fn count_sent_since(
        &self,
        sender_id: UserId,
        from: Timestamp,
    ) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM chat_messages WHERE sender_id = $1 AND created_at >= $2"#,
        )
        .bind(Uuid::from(sender_id))
        .bind(from)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        u64::try_from(count).map_err(|err| invalid_data(err.to_string()))
    }
}

#[derive(Clone)]
pub struct PgStorage {
    pub pool: PgPool,
    pub thread_repository: Arc<PgThreadRepository>,
    pub message_repository: Arc<PgMessageRepository>,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            thread_repository: Arc::new(PgThreadRepository::new(pool.clone())),
            message_repository: Arc::new(PgMessageRepository::new(pool.clone())),
            pool,
        }
    }
}

pub async fn create_pg_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

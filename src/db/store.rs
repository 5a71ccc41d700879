//! Message persistence bridge.
//!
//! `ConversationStore` is the narrow async interface the dispatcher uses to
//! authorize joins/sends and to record messages. `SqliteStore` is the shipped
//! adapter: every call runs on the blocking pool so a slow disk never stalls
//! other connections.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{types::Type, Connection, OptionalExtension, Row};

use crate::db::models::{Conversation, Message, MessageStatus, MessageType, NewMessage};
use crate::db::DbPool;
use crate::error::StoreError;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Fetch a conversation and its two participants.
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation, StoreError>;

    /// Persist a message with status `sent` and advance the conversation's
    /// last-message pointer in the same write.
    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError>;

    /// Upgrade `sent` → `delivered`. Returns false when the message had already
    /// moved past `sent`.
    async fn mark_delivered(&self, message_id: &str) -> Result<bool, StoreError>;

    /// Record `reader_id` as having read each named message of the conversation
    /// that the reader did not send. Returns the ids newly marked for this reader.
    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
        reader_id: &str,
    ) -> Result<Vec<String>, StoreError>;

    async fn message(&self, message_id: &str) -> Result<Message, StoreError>;
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    db: DbPool,
}

impl SqliteStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Provision a conversation between a seeker and a guide.
    /// Conversations are normally created by the REST layer; this is used for
    /// seeding and tests.
    pub async fn create_conversation(
        &self,
        seeker_id: &str,
        guide_id: &str,
    ) -> Result<Conversation, StoreError> {
        let conversation = Conversation {
            id: uuid::Uuid::now_v7().to_string(),
            seeker_id: seeker_id.to_string(),
            guide_id: guide_id.to_string(),
            last_message_id: None,
        };
        let row = conversation.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, seeker_id, guide_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![row.id, row.seeker_id, row.guide_id, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await?;
        Ok(conversation)
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| StoreError::Task(format!("DB lock poisoned: {}", e)))?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn conversation(&self, conversation_id: &str) -> Result<Conversation, StoreError> {
        let id = conversation_id.to_string();
        self.with_conn(move |conn| {
            conn.query_row(
                "SELECT id, seeker_id, guide_id, last_message_id FROM conversations WHERE id = ?1",
                rusqlite::params![id],
                |row| {
                    Ok(Conversation {
                        id: row.get(0)?,
                        seeker_id: row.get(1)?,
                        guide_id: row.get(2)?,
                        last_message_id: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("Conversation {}", id)))
        })
        .await
    }

    async fn append_message(&self, message: NewMessage) -> Result<Message, StoreError> {
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;

            let exists: Option<String> = tx
                .query_row(
                    "SELECT id FROM conversations WHERE id = ?1",
                    rusqlite::params![message.conversation_id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(StoreError::NotFound(format!(
                    "Conversation {}",
                    message.conversation_id
                )));
            }

            let id = uuid::Uuid::now_v7().to_string();
            let now = Utc::now();
            let now_str = now.to_rfc3339();

            tx.execute(
                "INSERT INTO messages (id, conversation_id, sender_id, message_type, content,
                    file_url, file_name, file_size, file_extension, duration, audio_call_id,
                    status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                rusqlite::params![
                    id,
                    message.conversation_id,
                    message.sender_id,
                    message.message_type.as_str(),
                    message.content,
                    message.file_url,
                    message.file_name,
                    message.file_size,
                    message.file_extension,
                    message.duration,
                    message.audio_call_id,
                    MessageStatus::Sent.as_str(),
                    now_str,
                ],
            )?;

            tx.execute(
                "UPDATE conversations SET last_message_id = ?1, last_message_at = ?2 WHERE id = ?3",
                rusqlite::params![id, now_str, message.conversation_id],
            )?;

            tx.commit()?;

            Ok(Message {
                id,
                conversation_id: message.conversation_id,
                sender_id: message.sender_id,
                message_type: message.message_type,
                content: message.content,
                file_url: message.file_url,
                file_name: message.file_name,
                file_size: message.file_size,
                file_extension: message.file_extension,
                duration: message.duration,
                audio_call_id: message.audio_call_id,
                status: MessageStatus::Sent,
                read_by: Vec::new(),
                created_at: now,
            })
        })
        .await
    }

    async fn mark_delivered(&self, message_id: &str) -> Result<bool, StoreError> {
        let id = message_id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET status = 'delivered', updated_at = ?1 WHERE id = ?2 AND status = 'sent'",
                rusqlite::params![Utc::now().to_rfc3339(), id],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn mark_read(
        &self,
        conversation_id: &str,
        message_ids: &[String],
        reader_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let conversation_id = conversation_id.to_string();
        let message_ids = message_ids.to_vec();
        let reader_id = reader_id.to_string();

        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let now = Utc::now().to_rfc3339();
            let mut newly_read = Vec::new();

            for message_id in &message_ids {
                let sender: Option<String> = tx
                    .query_row(
                        "SELECT sender_id FROM messages WHERE id = ?1 AND conversation_id = ?2",
                        rusqlite::params![message_id, conversation_id],
                        |row| row.get(0),
                    )
                    .optional()?;

                // Unknown, foreign, or own messages are skipped
                match sender {
                    Some(sender) if sender != reader_id => {}
                    _ => continue,
                }

                let inserted = tx.execute(
                    "INSERT OR IGNORE INTO message_reads (message_id, user_id, read_at) VALUES (?1, ?2, ?3)",
                    rusqlite::params![message_id, reader_id, now],
                )?;
                tx.execute(
                    "UPDATE messages SET status = 'read', updated_at = ?1 WHERE id = ?2 AND status != 'read'",
                    rusqlite::params![now, message_id],
                )?;

                if inserted > 0 {
                    newly_read.push(message_id.clone());
                }
            }

            tx.commit()?;
            Ok(newly_read)
        })
        .await
    }

    async fn message(&self, message_id: &str) -> Result<Message, StoreError> {
        let id = message_id.to_string();
        self.with_conn(move |conn| {
            let mut message = conn
                .query_row(
                    "SELECT id, conversation_id, sender_id, message_type, content, file_url,
                            file_name, file_size, file_extension, duration, audio_call_id,
                            status, created_at
                     FROM messages WHERE id = ?1",
                    rusqlite::params![id],
                    map_message_row,
                )
                .optional()?
                .ok_or_else(|| StoreError::NotFound(format!("Message {}", id)))?;

            let mut stmt = conn.prepare(
                "SELECT user_id FROM message_reads WHERE message_id = ?1 ORDER BY read_at, rowid",
            )?;
            message.read_by = stmt
                .query_map(rusqlite::params![id], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(message)
        })
        .await
    }
}

fn map_message_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let type_str: String = row.get(3)?;
    let message_type = MessageType::parse(&type_str)
        .ok_or_else(|| conversion_error(3, format!("unknown message type {}", type_str)))?;

    let status_str: String = row.get(11)?;
    let status = MessageStatus::parse(&status_str)
        .ok_or_else(|| conversion_error(11, format!("unknown status {}", status_str)))?;

    let created_at: String = row.get(12)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| conversion_error(12, e.to_string()))?
        .with_timezone(&Utc);

    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_id: row.get(2)?,
        message_type,
        content: row.get(4)?,
        file_url: row.get(5)?,
        file_name: row.get(6)?,
        file_size: row.get(7)?,
        file_extension: row.get(8)?,
        duration: row.get(9)?,
        audio_call_id: row.get(10)?,
        status,
        read_by: Vec::new(),
        created_at,
    })
}

fn conversion_error(column: usize, reason: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, reason.into())
}

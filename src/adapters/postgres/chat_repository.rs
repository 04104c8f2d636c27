//! PostgreSQL implementation of ChatRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::convert::{parse_column, to_pg_int};
use crate::domain::chat::{ChatMessage, ChatSession, ChatSource};
use crate::domain::foundation::{ChatSessionId, ChildId, DeviceId, DomainError, ErrorCode, Timestamp};
use crate::ports::ChatRepository;

pub struct PostgresChatRepository {
    pool: PgPool,
}

impl PostgresChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    child_id: String,
    source: String,
    device_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for ChatSession {
    type Error = DomainError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(ChatSession {
            id: parse_column::<ChatSessionId, _>("id", &row.id)?,
            child_id: parse_column::<ChildId, _>("child_id", &row.child_id)?,
            source: parse_column::<ChatSource, _>("source", &row.source)?,
            device_id: row
                .device_id
                .as_deref()
                .map(|d| parse_column::<DeviceId, _>("device_id", d))
                .transpose()?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl ChatRepository for PostgresChatRepository {
    async fn find_session(&self, id: &ChatSessionId) -> Result<Option<ChatSession>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, child_id, source, device_id, created_at FROM chat_sessions WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find chat session", e))?;

        row.map(ChatSession::try_from).transpose()
    }

    async fn create_session(&self, session: &ChatSession) -> Result<ChatSession, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, child_id, source, device_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(session.id.as_str())
        .bind(session.child_id.as_str())
        .bind(session.source.as_str())
        .bind(session.device_id.as_ref().map(|d| d.as_str()))
        .bind(session.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to create chat session", e))?;

        self.find_session(&session.id).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Chat session {} vanished after insert", session.id),
            )
        })
    }

    async fn append_message(&self, message: &ChatMessage) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO chat_messages (
                id, session_id, role, content, tokens, topic_tags, safety_hits, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(message.session_id.as_str())
        .bind(message.role.as_str())
        .bind(&message.content)
        .bind(to_pg_int(message.tokens))
        .bind(message.topic_tags.as_ref().map(Json))
        .bind(message.safety_hits.as_ref().map(Json))
        .bind(message.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_foreign_key_violation() {
                    return DomainError::new(
                        ErrorCode::ChatSessionNotFound,
                        format!("Chat session {} not found", message.session_id),
                    );
                }
            }
            DomainError::database("Failed to append chat message", e)
        })?;

        Ok(())
    }
}

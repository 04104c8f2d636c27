//! PostgreSQL implementation of DeviceEventLog.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::convert::parse_column;
use crate::domain::device::{DeviceEvent, DeviceEventType};
use crate::domain::foundation::{DeviceId, DomainError, EventId, Timestamp};
use crate::ports::DeviceEventLog;

pub struct PostgresDeviceEventLog {
    pool: PgPool,
}

impl PostgresDeviceEventLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    device_id: String,
    #[sqlx(rename = "type")]
    event_type: String,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for DeviceEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        Ok(DeviceEvent {
            id: EventId::from_uuid(row.id),
            device_id: parse_column::<DeviceId, _>("device_id", &row.device_id)?,
            event_type: parse_column::<DeviceEventType, _>("type", &row.event_type)?,
            payload: row.payload,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl DeviceEventLog for PostgresDeviceEventLog {
    async fn append(&self, event: &DeviceEvent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO device_events (id, device_id, type, payload, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.id.as_uuid())
        .bind(event.device_id.as_str())
        .bind(event.event_type.as_str())
        .bind(&event.payload)
        .bind(event.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to append device event", e))?;

        Ok(())
    }

    async fn recent_for_device(
        &self,
        device_id: &DeviceId,
        limit: u32,
    ) -> Result<Vec<DeviceEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, device_id, type, payload, created_at
            FROM device_events
            WHERE device_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(device_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to load device events", e))?;

        rows.into_iter().map(DeviceEvent::try_from).collect()
    }
}

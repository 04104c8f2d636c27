//! PostgreSQL implementation of DeviceRepository.
//!
//! The staleness guards run inside the `UPDATE ... WHERE` so the check and
//! the write are one statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::convert::{from_pg_int, parse_column, to_pg_int};
use crate::domain::device::{Device, DeviceStateUpdate, DeviceStatus, TelemetryUpdate};
use crate::domain::foundation::{
    ChildId, DeviceId, DomainError, ErrorCode, Timestamp, UserId,
};
use crate::ports::DeviceRepository;

const DEVICE_COLUMNS: &str = "id, owner_id, child_id, display_name, status, firmware_version, \
     tpu_present, battery_pct, play_time_min, adventures_count, last_seen, telemetry_at, \
     policy_version, created_at";

/// PostgreSQL implementation of the DeviceRepository port.
pub struct PostgresDeviceRepository {
    pool: PgPool,
}

impl PostgresDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: &DeviceId) -> Result<bool, DomainError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM devices WHERE id = $1)")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to look up device", e))
    }

    /// `Ok(None)` from a guarded update means stale if the device exists.
    async fn stale_or_missing(&self, id: &DeviceId) -> Result<Option<Device>, DomainError> {
        if self.exists(id).await? {
            Ok(None)
        } else {
            Err(device_not_found(id))
        }
    }
}

fn device_not_found(id: &DeviceId) -> DomainError {
    DomainError::new(ErrorCode::DeviceNotFound, format!("Device {} not found", id))
        .with_detail("device_id", id.as_str())
}

#[derive(Debug, sqlx::FromRow)]
struct DeviceRow {
    id: String,
    owner_id: String,
    child_id: Option<String>,
    display_name: String,
    status: String,
    firmware_version: Option<String>,
    tpu_present: bool,
    battery_pct: Option<i16>,
    play_time_min: i32,
    adventures_count: i32,
    last_seen: Option<DateTime<Utc>>,
    telemetry_at: Option<DateTime<Utc>>,
    policy_version: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let battery_pct = row
            .battery_pct
            .map(|b| {
                u8::try_from(b).map_err(|_| {
                    DomainError::new(ErrorCode::DatabaseError, format!("Invalid battery_pct {}", b))
                })
            })
            .transpose()?;

        Ok(Device {
            id: parse_column("device id", &row.id)?,
            owner_id: parse_column::<UserId, _>("owner_id", &row.owner_id)?,
            child_id: row
                .child_id
                .as_deref()
                .map(|c| parse_column::<ChildId, _>("child_id", c))
                .transpose()?,
            display_name: row.display_name,
            status: parse_column::<DeviceStatus, _>("status", &row.status)?,
            firmware_version: row.firmware_version,
            tpu_present: row.tpu_present,
            battery_pct,
            play_time_min: from_pg_int("play_time_min", row.play_time_min)?,
            adventures_count: from_pg_int("adventures_count", row.adventures_count)?,
            last_seen: row.last_seen.map(Timestamp::from_datetime),
            telemetry_at: row.telemetry_at.map(Timestamp::from_datetime),
            policy_version: from_pg_int("policy_version", row.policy_version)?,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<Device>, DomainError> {
        let row: Option<DeviceRow> =
            sqlx::query_as(&format!("SELECT {} FROM devices WHERE id = $1", DEVICE_COLUMNS))
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to find device", e))?;

        row.map(Device::try_from).transpose()
    }

    async fn list_for_child(&self, child_id: &ChildId) -> Result<Vec<Device>, DomainError> {
        let rows: Vec<DeviceRow> = sqlx::query_as(&format!(
            "SELECT {} FROM devices WHERE child_id = $1 ORDER BY created_at ASC",
            DEVICE_COLUMNS
        ))
        .bind(child_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list devices for child", e))?;

        rows.into_iter().map(Device::try_from).collect()
    }

    async fn save(&self, device: &Device) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO devices (
                id, owner_id, child_id, display_name, status, firmware_version, tpu_present,
                battery_pct, play_time_min, adventures_count, last_seen, telemetry_at,
                policy_version, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (id) DO UPDATE SET
                owner_id = EXCLUDED.owner_id,
                child_id = EXCLUDED.child_id,
                display_name = EXCLUDED.display_name,
                status = EXCLUDED.status,
                firmware_version = EXCLUDED.firmware_version,
                tpu_present = EXCLUDED.tpu_present,
                battery_pct = EXCLUDED.battery_pct,
                play_time_min = EXCLUDED.play_time_min,
                adventures_count = EXCLUDED.adventures_count,
                last_seen = EXCLUDED.last_seen,
                telemetry_at = EXCLUDED.telemetry_at,
                policy_version = EXCLUDED.policy_version
            "#,
        )
        .bind(device.id.as_str())
        .bind(device.owner_id.as_str())
        .bind(device.child_id.as_ref().map(|c| c.as_str()))
        .bind(&device.display_name)
        .bind(device.status.as_str())
        .bind(&device.firmware_version)
        .bind(device.tpu_present)
        .bind(device.battery_pct.map(i16::from))
        .bind(to_pg_int(device.play_time_min))
        .bind(to_pg_int(device.adventures_count))
        .bind(device.last_seen.map(|t| *t.as_datetime()))
        .bind(device.telemetry_at.map(|t| *t.as_datetime()))
        .bind(to_pg_int(device.policy_version))
        .bind(device.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save device", e))?;

        Ok(())
    }

    async fn apply_state(
        &self,
        id: &DeviceId,
        update: &DeviceStateUpdate,
    ) -> Result<Option<Device>, DomainError> {
        let row: Option<DeviceRow> = sqlx::query_as(&format!(
            r#"
            UPDATE devices SET
                status = $2,
                firmware_version = $3,
                tpu_present = $4,
                battery_pct = $5,
                last_seen = $6,
                child_id = COALESCE($7, child_id)
            WHERE id = $1 AND (last_seen IS NULL OR last_seen <= $6)
            RETURNING {}
            "#,
            DEVICE_COLUMNS
        ))
        .bind(id.as_str())
        .bind(update.status.as_str())
        .bind(&update.firmware_version)
        .bind(update.tpu_present)
        .bind(i16::from(update.battery_pct))
        .bind(update.last_seen.as_datetime())
        .bind(update.child_id.as_ref().map(|c| c.as_str()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to apply device state", e))?;

        match row {
            Some(row) => Ok(Some(Device::try_from(row)?)),
            None => self.stale_or_missing(id).await,
        }
    }

    async fn apply_telemetry(
        &self,
        id: &DeviceId,
        update: &TelemetryUpdate,
    ) -> Result<Option<Device>, DomainError> {
        let row: Option<DeviceRow> = sqlx::query_as(&format!(
            r#"
            UPDATE devices SET
                play_time_min = $2,
                adventures_count = $3,
                telemetry_at = COALESCE($4, telemetry_at)
            WHERE id = $1
              AND ($4::timestamptz IS NULL OR telemetry_at IS NULL OR telemetry_at <= $4)
            RETURNING {}
            "#,
            DEVICE_COLUMNS
        ))
        .bind(id.as_str())
        .bind(to_pg_int(update.play_time_min))
        .bind(to_pg_int(update.adventures_count))
        .bind(update.reported_at.map(|t| *t.as_datetime()))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to apply device telemetry", e))?;

        match row {
            Some(row) => Ok(Some(Device::try_from(row)?)),
            None => self.stale_or_missing(id).await,
        }
    }

    async fn confirm_policy_version(&self, id: &DeviceId, version: u32) -> Result<Device, DomainError> {
        let row: Option<DeviceRow> = sqlx::query_as(&format!(
            r#"
            UPDATE devices SET policy_version = GREATEST(policy_version, $2)
            WHERE id = $1
            RETURNING {}
            "#,
            DEVICE_COLUMNS
        ))
        .bind(id.as_str())
        .bind(to_pg_int(version))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to confirm policy version", e))?;

        row.ok_or_else(|| device_not_found(id))
            .and_then(Device::try_from)
    }
}

//! PostgreSQL implementation of SafetyPolicyRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use super::convert::{from_pg_int, from_pg_small, parse_column, to_pg_int};
use crate::domain::foundation::{ChildId, DomainError, Timestamp};
use crate::domain::policy::{AgeRating, SafetyPolicy};
use crate::ports::SafetyPolicyRepository;

const POLICY_COLUMNS: &str = "child_id, age_rating, blocked_keywords, allowed_topics, \
     disallowed_topics, quiet_start_min, quiet_end_min, daily_minutes_max, custom_instructions, \
     cloud_version, device_version, updated_at";

pub struct PostgresSafetyPolicyRepository {
    pool: PgPool,
}

impl PostgresSafetyPolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PolicyRow {
    child_id: String,
    age_rating: String,
    blocked_keywords: Json<Vec<String>>,
    allowed_topics: Option<Json<Vec<String>>>,
    disallowed_topics: Option<Json<Vec<String>>>,
    quiet_start_min: Option<i16>,
    quiet_end_min: Option<i16>,
    daily_minutes_max: Option<i32>,
    custom_instructions: Option<String>,
    cloud_version: i32,
    device_version: i32,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PolicyRow> for SafetyPolicy {
    type Error = DomainError;

    fn try_from(row: PolicyRow) -> Result<Self, Self::Error> {
        Ok(SafetyPolicy {
            child_id: parse_column::<ChildId, _>("child_id", &row.child_id)?,
            age_rating: parse_column::<AgeRating, _>("age_rating", &row.age_rating)?,
            blocked_keywords: row.blocked_keywords.0,
            allowed_topics: row.allowed_topics.map(|j| j.0),
            disallowed_topics: row.disallowed_topics.map(|j| j.0),
            quiet_start_min: row
                .quiet_start_min
                .map(|m| from_pg_small("quiet_start_min", m))
                .transpose()?,
            quiet_end_min: row
                .quiet_end_min
                .map(|m| from_pg_small("quiet_end_min", m))
                .transpose()?,
            daily_minutes_max: row
                .daily_minutes_max
                .map(|m| from_pg_int("daily_minutes_max", m))
                .transpose()?,
            custom_instructions: row.custom_instructions,
            cloud_version: from_pg_int("cloud_version", row.cloud_version)?,
            device_version: from_pg_int("device_version", row.device_version)?,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn to_pg_small(value: u16) -> i16 {
    i16::try_from(value).unwrap_or(i16::MAX)
}

#[async_trait]
impl SafetyPolicyRepository for PostgresSafetyPolicyRepository {
    async fn find_by_child(&self, child_id: &ChildId) -> Result<Option<SafetyPolicy>, DomainError> {
        let row: Option<PolicyRow> = sqlx::query_as(&format!(
            "SELECT {} FROM safety_policies WHERE child_id = $1",
            POLICY_COLUMNS
        ))
        .bind(child_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to find safety policy", e))?;

        row.map(SafetyPolicy::try_from).transpose()
    }

    async fn upsert(&self, policy: &SafetyPolicy) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO safety_policies (
                child_id, age_rating, blocked_keywords, allowed_topics, disallowed_topics,
                quiet_start_min, quiet_end_min, daily_minutes_max, custom_instructions,
                cloud_version, device_version, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (child_id) DO UPDATE SET
                age_rating = EXCLUDED.age_rating,
                blocked_keywords = EXCLUDED.blocked_keywords,
                allowed_topics = EXCLUDED.allowed_topics,
                disallowed_topics = EXCLUDED.disallowed_topics,
                quiet_start_min = EXCLUDED.quiet_start_min,
                quiet_end_min = EXCLUDED.quiet_end_min,
                daily_minutes_max = EXCLUDED.daily_minutes_max,
                custom_instructions = EXCLUDED.custom_instructions,
                cloud_version = EXCLUDED.cloud_version,
                device_version = GREATEST(safety_policies.device_version, EXCLUDED.device_version),
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(policy.child_id.as_str())
        .bind(policy.age_rating.as_str())
        .bind(Json(&policy.blocked_keywords))
        .bind(policy.allowed_topics.as_ref().map(Json))
        .bind(policy.disallowed_topics.as_ref().map(Json))
        .bind(policy.quiet_start_min.map(to_pg_small))
        .bind(policy.quiet_end_min.map(to_pg_small))
        .bind(policy.daily_minutes_max.map(to_pg_int))
        .bind(&policy.custom_instructions)
        .bind(to_pg_int(policy.cloud_version))
        .bind(to_pg_int(policy.device_version))
        .bind(policy.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to save safety policy", e))?;

        Ok(())
    }

    async fn save_if_version(
        &self,
        policy: &SafetyPolicy,
        expected_version: Option<u32>,
    ) -> Result<bool, DomainError> {
        let query = match expected_version {
            None => sqlx::query(
                r#"
                INSERT INTO safety_policies (
                    child_id, age_rating, blocked_keywords, allowed_topics, disallowed_topics,
                    quiet_start_min, quiet_end_min, daily_minutes_max, custom_instructions,
                    cloud_version, device_version, updated_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ON CONFLICT (child_id) DO NOTHING
                "#,
            ),
            Some(_) => sqlx::query(
                r#"
                UPDATE safety_policies SET
                    age_rating = $2,
                    blocked_keywords = $3,
                    allowed_topics = $4,
                    disallowed_topics = $5,
                    quiet_start_min = $6,
                    quiet_end_min = $7,
                    daily_minutes_max = $8,
                    custom_instructions = $9,
                    cloud_version = $10,
                    device_version = GREATEST(device_version, $11),
                    updated_at = $12
                WHERE child_id = $1 AND cloud_version = $13
                "#,
            ),
        };

        let mut query = query
            .bind(policy.child_id.as_str())
            .bind(policy.age_rating.as_str())
            .bind(Json(&policy.blocked_keywords))
            .bind(policy.allowed_topics.as_ref().map(Json))
            .bind(policy.disallowed_topics.as_ref().map(Json))
            .bind(policy.quiet_start_min.map(to_pg_small))
            .bind(policy.quiet_end_min.map(to_pg_small))
            .bind(policy.daily_minutes_max.map(to_pg_int))
            .bind(&policy.custom_instructions)
            .bind(to_pg_int(policy.cloud_version))
            .bind(to_pg_int(policy.device_version))
            .bind(policy.updated_at.as_datetime());
        if let Some(version) = expected_version {
            query = query.bind(to_pg_int(version));
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to save safety policy", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_device_version(
        &self,
        child_id: &ChildId,
        version: u32,
    ) -> Result<Option<SafetyPolicy>, DomainError> {
        let row: Option<PolicyRow> = sqlx::query_as(&format!(
            r#"
            UPDATE safety_policies SET device_version = $2, updated_at = NOW()
            WHERE child_id = $1 AND $2 > device_version AND $2 <= cloud_version
            RETURNING {}
            "#,
            POLICY_COLUMNS
        ))
        .bind(child_id.as_str())
        .bind(to_pg_int(version))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to record device policy version", e))?;

        match row {
            Some(row) => Ok(Some(SafetyPolicy::try_from(row)?)),
            None => self.find_by_child(child_id).await,
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::{Schedule, ScheduleId};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::repository_ports::ScheduleRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresScheduleRepository {
    pool: PgPool,
}

impl PostgresScheduleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: ScheduleRow) -> Result<Schedule> {
        Ok(Schedule {
            id: row.id.into(),
            job_id: row.job_id.into(),
            kind: row.kind.parse()?,
            start_at: row.start_at,
            end_at: row.end_at,
            duration_s: row.duration_s,
            retry_policy: row.retry_policy,
            enabled: row.enabled,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ScheduleRow {
    id: Uuid,
    job_id: Uuid,
    #[sqlx(rename = "type")]
    kind: String,
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    duration_s: Option<i64>,
    retry_policy: Option<Value>,
    enabled: bool,
}

const SCHEDULE_COLUMNS: &str =
    "id, job_id, type, start_at, end_at, duration_s, retry_policy, enabled";

#[async_trait]
impl ScheduleRepository for PostgresScheduleRepository {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO schedules
                (id, job_id, type, start_at, end_at, duration_s, retry_policy, enabled)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(schedule.id.to_uuid())
        .bind(schedule.job_id.to_uuid())
        .bind(schedule.kind.as_str())
        .bind(schedule.start_at)
        .bind(schedule.end_at)
        .bind(schedule.duration_s)
        .bind(&schedule.retry_policy)
        .bind(schedule.enabled)
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to insert schedule: {e}"))
        })?;

        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>> {
        let query = format!("SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = $1");
        let row = sqlx::query_as::<_, ScheduleRow>(&query)
            .bind(id.to_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!("Failed to load schedule {id}: {e}"))
            })?;

        row.map(Self::map_row).transpose()
    }

    async fn eligible_schedules(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Schedule>> {
        let query = format!(
            "SELECT {SCHEDULE_COLUMNS} FROM schedules \
             WHERE enabled AND start_at <= $1 \
             ORDER BY start_at, id"
        );
        let rows = sqlx::query_as::<_, ScheduleRow>(&query)
            .bind(now)
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!(
                    "Failed to query eligible schedules: {e}"
                ))
            })?;

        rows.into_iter().map(Self::map_row).collect()
    }
}

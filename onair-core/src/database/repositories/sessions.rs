use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::{JobId, ScheduleId, Session, SessionId, SessionState};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::repository_ports::SessionRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_row(row: SessionRow) -> Result<Session> {
        Ok(Session {
            id: row.id.into(),
            job_id: row.job_id.into(),
            schedule_id: row.schedule_id.map(Into::into),
            trigger: row.trigger.parse()?,
            state: row.state.parse()?,
            planned_start_at: row.planned_start_at,
            planned_end_at: row.planned_end_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    job_id: Uuid,
    schedule_id: Option<Uuid>,
    trigger: String,
    state: String,
    planned_start_at: DateTime<Utc>,
    planned_end_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn has_active_session(&self, schedule_id: ScheduleId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sessions
                WHERE schedule_id = $1
                  AND state IN ('queued', 'starting', 'running')
            )
            "#,
        )
        .bind(schedule_id.to_uuid())
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!(
                "Failed to check active sessions for schedule {schedule_id}: {e}"
            ))
        })?;

        Ok(exists)
    }

    async fn insert_session(&self, session: &Session) -> Result<bool> {
        // The partial unique index on active scheduled sessions turns a
        // racing duplicate into a no-op.
        let result = sqlx::query(
            r#"
            INSERT INTO sessions
                (id, job_id, schedule_id, trigger, state,
                 planned_start_at, planned_end_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(session.id.to_uuid())
        .bind(session.job_id.to_uuid())
        .bind(session.schedule_id.map(|id| id.to_uuid()))
        .bind(session.trigger.as_str())
        .bind(session.state.as_str())
        .bind(session.planned_start_at)
        .bind(session.planned_end_at)
        .bind(session.created_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to insert session: {e}"))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn list_sessions(&self, job_id: Option<JobId>) -> Result<Vec<Session>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, job_id, schedule_id, trigger, state,
                   planned_start_at, planned_end_at, created_at
            FROM sessions
            WHERE ($1::uuid IS NULL OR job_id = $1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(job_id.map(|id| id.to_uuid()))
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to list sessions: {e}"))
        })?;

        rows.into_iter().map(Self::map_row).collect()
    }

    async fn update_session_state(
        &self,
        id: SessionId,
        state: SessionState,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE sessions SET state = $2 WHERE id = $1")
            .bind(id.to_uuid())
            .bind(state.as_str())
            .execute(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!(
                    "Failed to update session {id} state: {e}"
                ))
            })?;

        Ok(result.rows_affected() == 1)
    }
}

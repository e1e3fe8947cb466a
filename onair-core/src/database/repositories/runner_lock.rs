use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::RunnerLock;
use sqlx::PgPool;

use crate::database::repository_ports::RunnerLockRepository;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresRunnerLockRepository {
    pool: PgPool,
}

impl PostgresRunnerLockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RunnerLockRow {
    runner_id: String,
    heartbeat_at: DateTime<Utc>,
}

#[async_trait]
impl RunnerLockRepository for PostgresRunnerLockRepository {
    async fn get(&self) -> Result<Option<RunnerLock>> {
        let row = sqlx::query_as::<_, RunnerLockRow>(
            "SELECT runner_id, heartbeat_at FROM runner_lock WHERE lock_id = 1",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to read runner lock: {e}"))
        })?;

        Ok(row.map(|row| RunnerLock::new(row.runner_id, row.heartbeat_at)))
    }

    async fn overwrite(&self, lock: &RunnerLock) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runner_lock (lock_id, runner_id, heartbeat_at)
            VALUES (1, $1, $2)
            ON CONFLICT (lock_id) DO UPDATE
                SET runner_id = EXCLUDED.runner_id,
                    heartbeat_at = EXCLUDED.heartbeat_at
            "#,
        )
        .bind(&lock.runner_id)
        .bind(lock.heartbeat_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to write runner lock: {e}"))
        })?;

        Ok(())
    }

    async fn insert_if_absent(&self, lock: &RunnerLock) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO runner_lock (lock_id, runner_id, heartbeat_at)
            VALUES (1, $1, $2)
            ON CONFLICT (lock_id) DO NOTHING
            "#,
        )
        .bind(&lock.runner_id)
        .bind(lock.heartbeat_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to claim runner lock: {e}"))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn compare_and_swap(
        &self,
        expected: &RunnerLock,
        next: &RunnerLock,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE runner_lock
            SET runner_id = $3, heartbeat_at = $4
            WHERE lock_id = 1 AND runner_id = $1 AND heartbeat_at = $2
            "#,
        )
        .bind(&expected.runner_id)
        .bind(expected.heartbeat_at)
        .bind(&next.runner_id)
        .bind(next.heartbeat_at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to take over runner lock: {e}"))
        })?;

        Ok(result.rows_affected() == 1)
    }

    async fn touch(&self, runner_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE runner_lock SET heartbeat_at = $2 WHERE lock_id = 1 AND runner_id = $1",
        )
        .bind(runner_id)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to heartbeat runner lock: {e}"))
        })?;

        Ok(result.rows_affected() == 1)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::{InvalidReasons, Job, JobBackup, JobId};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction, types::Json};
use uuid::Uuid;

use crate::database::repository_ports::{DowngradePlan, JobRepository};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct PostgresJobRepository {
    pool: PgPool,
}

impl PostgresJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn map_job(row: JobRow) -> Result<Job> {
        Ok(Job {
            id: row.id.into(),
            name: row.name,
            tier_required: row.tier_required.parse()?,
            destination_id: row.destination_id,
            video_asset_id: row.video_asset_id,
            loop_enabled: row.loop_enabled,
            crossfade_enabled: row.crossfade_enabled,
            audio_mode: row.audio_mode.parse()?,
            audio_asset_id: row.audio_asset_id,
            auto_recovery: row.auto_recovery,
            hot_swap_mode: row.hot_swap_mode.parse()?,
            scenes_enabled: row.scenes_enabled,
            swap_rules: row.swap_rules,
            scene_overrides: row.scene_overrides,
            preset_id: row.preset_id,
            status: row.status.parse()?,
            invalid_reasons: row.invalid_reasons.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn map_backup(row: BackupRow) -> Result<JobBackup> {
        Ok(JobBackup {
            id: row.id.into(),
            job_id: row.job_id.into(),
            previous_tier: row.previous_tier.parse()?,
            snapshot: row.snapshot,
            created_at: row.created_at,
        })
    }

    /// Rewrite a job's mutable columns inside `tx`. With `expected` set the
    /// update only applies when `updated_at` still matches.
    async fn write_job(
        tx: &mut Transaction<'_, Postgres>,
        job: &Job,
        expected: Option<DateTime<Utc>>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                name = $2,
                tier_required = $3,
                destination_id = $4,
                video_asset_id = $5,
                loop_enabled = $6,
                crossfade_enabled = $7,
                audio_mode = $8,
                audio_asset_id = $9,
                auto_recovery = $10,
                hot_swap_mode = $11,
                scenes_enabled = $12,
                swap_rules = $13,
                scene_overrides = $14,
                preset_id = $15,
                status = $16,
                invalid_reasons = $17,
                created_at = $18,
                updated_at = $19
            WHERE id = $1
              AND ($20::timestamptz IS NULL OR updated_at = $20)
            "#,
        )
        .bind(job.id.to_uuid())
        .bind(&job.name)
        .bind(job.tier_required.as_str())
        .bind(job.destination_id)
        .bind(job.video_asset_id)
        .bind(job.loop_enabled)
        .bind(job.crossfade_enabled)
        .bind(job.audio_mode.as_str())
        .bind(job.audio_asset_id)
        .bind(job.auto_recovery)
        .bind(job.hot_swap_mode.as_str())
        .bind(job.scenes_enabled)
        .bind(&job.swap_rules)
        .bind(&job.scene_overrides)
        .bind(job.preset_id)
        .bind(job.status.as_str())
        .bind(Json(&job.invalid_reasons))
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(expected)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to update job {}: {e}", job.id))
        })?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    name: String,
    tier_required: String,
    destination_id: Uuid,
    video_asset_id: Uuid,
    loop_enabled: bool,
    crossfade_enabled: bool,
    audio_mode: String,
    audio_asset_id: Option<Uuid>,
    auto_recovery: bool,
    hot_swap_mode: String,
    scenes_enabled: bool,
    swap_rules: Option<Value>,
    scene_overrides: Option<Value>,
    preset_id: Option<Uuid>,
    status: String,
    invalid_reasons: Json<InvalidReasons>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct BackupRow {
    id: Uuid,
    job_id: Uuid,
    previous_tier: String,
    snapshot: Value,
    created_at: DateTime<Utc>,
}

const JOB_COLUMNS: &str = "id, name, tier_required, destination_id, video_asset_id, \
     loop_enabled, crossfade_enabled, audio_mode, audio_asset_id, auto_recovery, \
     hot_swap_mode, scenes_enabled, swap_rules, scene_overrides, preset_id, status, \
     invalid_reasons, created_at, updated_at";

#[async_trait]
impl JobRepository for PostgresJobRepository {
    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&query)
            .bind(id.to_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!("Failed to load job {id}: {e}"))
            })?;

        row.map(Self::map_job).transpose()
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        let query = format!(
            "INSERT INTO jobs ({JOB_COLUMNS}) VALUES \
             ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)"
        );
        sqlx::query(&query)
            .bind(job.id.to_uuid())
            .bind(&job.name)
            .bind(job.tier_required.as_str())
            .bind(job.destination_id)
            .bind(job.video_asset_id)
            .bind(job.loop_enabled)
            .bind(job.crossfade_enabled)
            .bind(job.audio_mode.as_str())
            .bind(job.audio_asset_id)
            .bind(job.auto_recovery)
            .bind(job.hot_swap_mode.as_str())
            .bind(job.scenes_enabled)
            .bind(&job.swap_rules)
            .bind(&job.scene_overrides)
            .bind(job.preset_id)
            .bind(job.status.as_str())
            .bind(Json(&job.invalid_reasons))
            .bind(job.created_at)
            .bind(job.updated_at)
            .execute(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!("Failed to insert job {}: {e}", job.id))
            })?;

        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(|e| {
            CoreError::Database(format!("Failed to begin transaction: {e}"))
        })?;

        if Self::write_job(&mut tx, job, None).await? == 0 {
            return Err(CoreError::NotFound(format!("job {}", job.id)));
        }

        tx.commit().await.map_err(|e| {
            CoreError::Database(format!("Failed to commit job update: {e}"))
        })
    }

    async fn list_non_basic_jobs(&self) -> Result<Vec<Job>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE tier_required <> 'Basic' ORDER BY id"
        );
        let rows = sqlx::query_as::<_, JobRow>(&query)
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                CoreError::Database(format!("Failed to list non-basic jobs: {e}"))
            })?;

        rows.into_iter().map(Self::map_job).collect()
    }

    async fn apply_downgrade(&self, plans: &[DowngradePlan]) -> Result<()> {
        let mut tx = self.pool().begin().await.map_err(|e| {
            CoreError::Database(format!("Failed to begin transaction: {e}"))
        })?;

        for plan in plans {
            sqlx::query(
                r#"
                INSERT INTO job_backups (id, job_id, previous_tier, snapshot, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(plan.backup.id.to_uuid())
            .bind(plan.backup.job_id.to_uuid())
            .bind(plan.backup.previous_tier.as_str())
            .bind(&plan.backup.snapshot)
            .bind(plan.backup.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                CoreError::Database(format!(
                    "Failed to record backup for job {}: {e}",
                    plan.job.id
                ))
            })?;

            let written =
                Self::write_job(&mut tx, &plan.job, Some(plan.expected_updated_at))
                    .await?;
            if written == 0 {
                // Dropping the transaction rolls back every earlier plan.
                return Err(CoreError::Conflict(format!(
                    "job {} changed while downgrading",
                    plan.job.id
                )));
            }
        }

        tx.commit().await.map_err(|e| {
            CoreError::Database(format!("Failed to commit downgrade: {e}"))
        })
    }

    async fn latest_backup(&self, job_id: JobId) -> Result<Option<JobBackup>> {
        let row = sqlx::query_as::<_, BackupRow>(
            r#"
            SELECT id, job_id, previous_tier, snapshot, created_at
            FROM job_backups
            WHERE job_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(job_id.to_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!(
                "Failed to load latest backup for job {job_id}: {e}"
            ))
        })?;

        row.map(Self::map_backup).transpose()
    }

    async fn list_backups(&self, job_id: Option<JobId>) -> Result<Vec<JobBackup>> {
        let rows = sqlx::query_as::<_, BackupRow>(
            r#"
            SELECT id, job_id, previous_tier, snapshot, created_at
            FROM job_backups
            WHERE ($1::uuid IS NULL OR job_id = $1)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(job_id.map(|id| id.to_uuid()))
        .fetch_all(self.pool())
        .await
        .map_err(|e| {
            CoreError::Database(format!("Failed to list job backups: {e}"))
        })?;

        rows.into_iter().map(Self::map_backup).collect()
    }
}

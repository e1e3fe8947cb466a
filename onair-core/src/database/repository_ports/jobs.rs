use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::{Job, JobBackup, JobId};

use crate::error::Result;

/// One job's share of a downgrade: the backup to record and the demoted job
/// to write, guarded by the `updated_at` observed when the plan was made.
#[derive(Debug, Clone)]
pub struct DowngradePlan {
    pub expected_updated_at: DateTime<Utc>,
    pub backup: JobBackup,
    pub job: Job,
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn get_job(&self, id: JobId) -> Result<Option<Job>>;

    async fn insert_job(&self, job: &Job) -> Result<()>;

    /// Overwrite every mutable column of an existing job.
    async fn update_job(&self, job: &Job) -> Result<()>;

    /// Jobs whose `tier_required` is above Basic.
    async fn list_non_basic_jobs(&self) -> Result<Vec<Job>>;

    /// Apply every plan atomically. If any job's `updated_at` no longer
    /// matches `expected_updated_at` nothing is written and
    /// [`CoreError::Conflict`](crate::error::CoreError::Conflict) is returned.
    async fn apply_downgrade(&self, plans: &[DowngradePlan]) -> Result<()>;

    async fn latest_backup(&self, job_id: JobId) -> Result<Option<JobBackup>>;

    /// Backups newest first, optionally restricted to one job.
    async fn list_backups(&self, job_id: Option<JobId>) -> Result<Vec<JobBackup>>;
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ids::{JobBackupId, JobId},
    job::Job,
    tier::Tier,
};

/// Point-in-time copy of a job taken right before a downgrade.
///
/// Backups are retained indefinitely and may be restored any number of times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobBackup {
    pub id: JobBackupId,
    pub job_id: JobId,
    pub previous_tier: Tier,
    pub snapshot: Value,
    pub created_at: DateTime<Utc>,
}

impl JobBackup {
    pub fn capture(job: &Job, now: DateTime<Utc>) -> serde_json::Result<Self> {
        Ok(Self {
            id: JobBackupId::new(),
            job_id: job.id,
            previous_tier: job.tier_required,
            snapshot: serde_json::to_value(job)?,
            created_at: now,
        })
    }

    pub fn job(&self) -> serde_json::Result<Job> {
        serde_json::from_value(self.snapshot.clone())
    }
}

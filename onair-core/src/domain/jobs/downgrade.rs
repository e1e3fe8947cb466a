//! Bulk demotion of premium jobs to Basic, and restoring them afterwards.
//!
//! A cascade plans every change in memory and hands the whole batch to the
//! store, which applies it in one transaction guarded by each job's
//! `updated_at`. A conflict discards the batch and the cascade re-plans from
//! fresh reads, up to the configured number of attempts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use onair_model::{
    AudioMode, HotSwapMode, InvalidReason, InvalidReasons, Job, JobBackup,
    JobId, JobStatus, Tier,
};
use tracing::{info, warn};

use crate::{
    clock::Clock,
    database::repository_ports::{DowngradePlan, JobRepository},
};

use super::error::DowngradeError;

pub const DEFAULT_CASCADE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DowngradeReport {
    /// Jobs demoted by this invocation, each with one new backup.
    pub downgraded: Vec<JobId>,
    pub attempts: u32,
}

impl DowngradeReport {
    pub fn is_noop(&self) -> bool {
        self.downgraded.is_empty()
    }
}

/// `job` reset to Basic with every premium-gated feature cleared, marked
/// invalid with `reason` appended to any reasons it already had.
pub fn demote(job: &Job, reason: &InvalidReason, now: DateTime<Utc>) -> Job {
    let mut invalid_reasons = job.invalid_reasons.clone();
    invalid_reasons.insert(reason.clone());

    Job {
        tier_required: Tier::Basic,
        audio_mode: AudioMode::None,
        auto_recovery: false,
        hot_swap_mode: HotSwapMode::Immediate,
        scenes_enabled: false,
        swap_rules: None,
        scene_overrides: None,
        status: JobStatus::Invalid,
        invalid_reasons,
        updated_at: now,
        ..job.clone()
    }
}

#[derive(Clone)]
pub struct DowngradeCascade {
    jobs: Arc<dyn JobRepository>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
}

impl std::fmt::Debug for DowngradeCascade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DowngradeCascade")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl DowngradeCascade {
    pub fn new(jobs: Arc<dyn JobRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            jobs,
            clock,
            max_attempts: DEFAULT_CASCADE_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Back up and demote every job above Basic.
    ///
    /// Jobs already at Basic are untouched, so re-running is a no-op. Either
    /// every planned job is demoted or none is.
    pub async fn downgrade_all(
        &self,
        reason: InvalidReason,
    ) -> Result<DowngradeReport, DowngradeError> {
        for attempt in 1..=self.max_attempts {
            let now = self.clock.now();
            let candidates = self.jobs.list_non_basic_jobs().await?;
            if candidates.is_empty() {
                return Ok(DowngradeReport {
                    downgraded: Vec::new(),
                    attempts: attempt,
                });
            }

            let plans = candidates
                .iter()
                .map(|job| {
                    Ok(DowngradePlan {
                        expected_updated_at: job.updated_at,
                        backup: JobBackup::capture(job, now)?,
                        job: demote(job, &reason, now),
                    })
                })
                .collect::<Result<Vec<_>, serde_json::Error>>()?;

            match self.jobs.apply_downgrade(&plans).await {
                Ok(()) => {
                    info!(
                        jobs = plans.len(),
                        attempt,
                        reason = %reason,
                        "downgraded jobs to Basic"
                    );
                    return Ok(DowngradeReport {
                        downgraded: plans.iter().map(|plan| plan.job.id).collect(),
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_conflict() => {
                    warn!(attempt, "downgrade batch conflicted, re-planning: {err}");
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(DowngradeError::ConcurrentModification {
            attempts: self.max_attempts,
        })
    }

    /// Overwrite the job from its most recent backup and return it as a
    /// draft with no invalid reasons. The backup is left in place.
    pub async fn restore(&self, job_id: JobId) -> Result<Job, DowngradeError> {
        let backup = self
            .jobs
            .latest_backup(job_id)
            .await?
            .ok_or(DowngradeError::NoBackupFound(job_id))?;
        let current = self
            .jobs
            .get_job(job_id)
            .await?
            .ok_or(DowngradeError::JobNotFound(job_id))?;

        let snapshot = backup.job()?;
        let restored = Job {
            id: current.id,
            status: JobStatus::Draft,
            invalid_reasons: InvalidReasons::new(),
            updated_at: self.clock.now(),
            ..snapshot
        };
        self.jobs.update_job(&restored).await?;

        info!(
            job_id = %job_id,
            backup_id = %backup.id,
            tier = %restored.tier_required,
            "restored job from backup"
        );
        Ok(restored)
    }

    pub async fn list_backups(
        &self,
        job_id: Option<JobId>,
    ) -> Result<Vec<JobBackup>, DowngradeError> {
        Ok(self.jobs.list_backups(job_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::ManualClock, database::InMemoryStore};
    use chrono::Duration;
    use serde_json::json;
    use uuid::Uuid;

    fn premium_job(now: DateTime<Utc>) -> Job {
        let mut job = Job::new("Premium show", Uuid::new_v4(), Uuid::new_v4(), now);
        job.tier_required = Tier::Ultimate;
        job.audio_mode = AudioMode::Mix;
        job.audio_asset_id = Some(Uuid::new_v4());
        job.auto_recovery = true;
        job.hot_swap_mode = HotSwapMode::EndOfLoop;
        job.scenes_enabled = true;
        job.swap_rules = Some(json!({"after_loops": 2}));
        job.scene_overrides = Some(json!([{"scene": "intro"}]));
        job.status = JobStatus::Valid;
        job
    }

    fn cascade(store: &Arc<InMemoryStore>, clock: &Arc<ManualClock>) -> DowngradeCascade {
        DowngradeCascade::new(store.clone(), clock.clone())
    }

    #[test]
    fn demote_clears_premium_features_and_appends_reason() {
        let now = Utc::now();
        let mut job = premium_job(now);
        job.invalid_reasons.insert(InvalidReason::CrossfadeRequiresLoop);

        let later = now + Duration::minutes(1);
        let demoted = demote(&job, &InvalidReason::LicenseExpired, later);

        assert_eq!(demoted.tier_required, Tier::Basic);
        assert_eq!(demoted.audio_mode, AudioMode::None);
        assert!(!demoted.auto_recovery);
        assert_eq!(demoted.hot_swap_mode, HotSwapMode::Immediate);
        assert!(!demoted.scenes_enabled);
        assert_eq!(demoted.swap_rules, None);
        assert_eq!(demoted.scene_overrides, None);
        assert_eq!(demoted.status, JobStatus::Invalid);
        assert_eq!(
            demoted.invalid_reasons.to_string(),
            "Crossfade requires loop; License expired"
        );
        assert_eq!(demoted.updated_at, later);
        // Untouched fields survive.
        assert_eq!(demoted.audio_asset_id, job.audio_asset_id);
        assert_eq!(demoted.name, job.name);
    }

    #[tokio::test]
    async fn conflicts_are_retried_as_a_whole() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let job = premium_job(clock.now());
        store.insert_job(&job).await.unwrap();

        store.conflict_next_downgrades(2).await;
        let report = cascade(&store, &clock)
            .downgrade_all(InvalidReason::LicenseExpired)
            .await
            .unwrap();

        assert_eq!(report.attempts, 3);
        assert_eq!(report.downgraded, vec![job.id]);
        assert_eq!(store.list_backups(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn persistent_conflict_surfaces_concurrent_modification() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        store.insert_job(&premium_job(clock.now())).await.unwrap();

        store.conflict_next_downgrades(5).await;
        let err = cascade(&store, &clock)
            .with_max_attempts(2)
            .downgrade_all(InvalidReason::LicenseExpired)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DowngradeError::ConcurrentModification { attempts: 2 }
        ));
        assert!(store.list_backups(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn restore_without_backup_fails() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let job = premium_job(clock.now());
        store.insert_job(&job).await.unwrap();

        let err = cascade(&store, &clock).restore(job.id).await.unwrap_err();
        assert!(matches!(err, DowngradeError::NoBackupFound(id) if id == job.id));
    }
}

//! Process-local store implementing every repository port.
//!
//! Used by the test suites and by `--in-memory` development runs. All tables
//! sit behind one async mutex, so each port call is atomic with respect to
//! the others.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::{
    Job, JobBackup, JobId, LicenseActivity, LicenseState, MemberLicense,
    MemberLicenseId, RunnerLock, Schedule, ScheduleId, Session, SessionId,
    SessionState, TierCounts,
};
use tokio::sync::Mutex;

use crate::database::repository_ports::{
    DowngradePlan, JobRepository, LicenseRepository, RunnerLockRepository,
    ScheduleRepository, SessionRepository,
};
use crate::error::{CoreError, Result};

#[derive(Debug, Default)]
struct Tables {
    runner_lock: Option<RunnerLock>,
    jobs: HashMap<JobId, Job>,
    schedules: HashMap<ScheduleId, Schedule>,
    sessions: Vec<Session>,
    members: HashMap<String, MemberLicense>,
    license_state: Option<LicenseState>,
    activity: Vec<LicenseActivity>,
    backups: Vec<JobBackup>,
    faults: Faults,
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    failing_downgrades: u32,
    conflicting_downgrades: u32,
}

impl Tables {
    fn check_available(&self) -> Result<()> {
        if self.faults.unavailable {
            return Err(CoreError::Database("store unavailable".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a storage error until cleared.
    #[doc(hidden)]
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.tables.lock().await.faults.unavailable = unavailable;
    }

    /// Fail the next `count` downgrade batches with a storage error.
    #[doc(hidden)]
    pub async fn fail_next_downgrades(&self, count: u32) {
        self.tables.lock().await.faults.failing_downgrades = count;
    }

    /// Reject the next `count` downgrade batches as concurrently modified.
    #[doc(hidden)]
    pub async fn conflict_next_downgrades(&self, count: u32) {
        self.tables.lock().await.faults.conflicting_downgrades = count;
    }
}

#[async_trait]
impl RunnerLockRepository for InMemoryStore {
    async fn get(&self) -> Result<Option<RunnerLock>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.runner_lock.clone())
    }

    async fn overwrite(&self, lock: &RunnerLock) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        tables.runner_lock = Some(lock.clone());
        Ok(())
    }

    async fn insert_if_absent(&self, lock: &RunnerLock) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        if tables.runner_lock.is_some() {
            return Ok(false);
        }
        tables.runner_lock = Some(lock.clone());
        Ok(true)
    }

    async fn compare_and_swap(
        &self,
        expected: &RunnerLock,
        next: &RunnerLock,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        match tables.runner_lock.as_mut() {
            Some(current) if current == expected => {
                *current = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn touch(&self, runner_id: &str, at: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        match tables.runner_lock.as_mut() {
            Some(current) if current.is_held_by(runner_id) => {
                current.heartbeat_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl ScheduleRepository for InMemoryStore {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        if !tables.jobs.contains_key(&schedule.job_id) {
            return Err(CoreError::NotFound(format!("job {}", schedule.job_id)));
        }
        tables.schedules.insert(schedule.id, schedule.clone());
        Ok(())
    }

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.schedules.get(&id).cloned())
    }

    async fn eligible_schedules(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Schedule>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        let mut eligible: Vec<Schedule> = tables
            .schedules
            .values()
            .filter(|schedule| schedule.is_eligible(now))
            .cloned()
            .collect();
        eligible.sort_by_key(|schedule| (schedule.start_at, schedule.id));
        Ok(eligible)
    }
}

#[async_trait]
impl SessionRepository for InMemoryStore {
    async fn has_active_session(&self, schedule_id: ScheduleId) -> Result<bool> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.sessions.iter().any(|session| {
            session.schedule_id == Some(schedule_id) && session.state.is_active()
        }))
    }

    async fn insert_session(&self, session: &Session) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        if let Some(schedule_id) = session.schedule_id
            && session.state.is_active()
            && tables.sessions.iter().any(|existing| {
                existing.schedule_id == Some(schedule_id)
                    && existing.state.is_active()
            })
        {
            return Ok(false);
        }
        tables.sessions.push(session.clone());
        Ok(true)
    }

    async fn list_sessions(&self, job_id: Option<JobId>) -> Result<Vec<Session>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        let mut sessions: Vec<Session> = tables
            .sessions
            .iter()
            .filter(|session| job_id.is_none_or(|job_id| session.job_id == job_id))
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
        });
        Ok(sessions)
    }

    async fn update_session_state(
        &self,
        id: SessionId,
        state: SessionState,
    ) -> Result<bool> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        match tables.sessions.iter_mut().find(|session| session.id == id) {
            Some(session) => {
                session.state = state;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl LicenseRepository for InMemoryStore {
    async fn upsert_member(&self, member: &MemberLicense) -> Result<MemberLicense> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        let stored = match tables.members.get(&member.install_id) {
            Some(existing) => MemberLicense {
                id: existing.id,
                ..member.clone()
            },
            None => member.clone(),
        };
        tables
            .members
            .insert(stored.install_id.clone(), stored.clone());
        Ok(stored)
    }

    async fn find_member_by_install_id(
        &self,
        install_id: &str,
    ) -> Result<Option<MemberLicense>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.members.get(install_id).cloned())
    }

    async fn get_member(&self, id: MemberLicenseId) -> Result<Option<MemberLicense>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.members.values().find(|member| member.id == id).cloned())
    }

    async fn set_member_active(
        &self,
        install_id: &str,
        active: bool,
    ) -> Result<Option<MemberLicense>> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.members.get_mut(install_id).map(|member| {
            member.active = active;
            member.clone()
        }))
    }

    async fn count_active_members_by_tier(&self) -> Result<TierCounts> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        let mut counts = TierCounts::default();
        for member in tables.members.values().filter(|member| member.active) {
            counts.record(member.tier, 1);
        }
        Ok(counts)
    }

    async fn load_state(&self) -> Result<Option<LicenseState>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.license_state.clone())
    }

    async fn save_state(&self, state: &LicenseState) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        tables.license_state = Some(state.clone());
        Ok(())
    }

    async fn append_activity(&self, activity: &LicenseActivity) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        tables.activity.push(activity.clone());
        Ok(())
    }

    async fn list_activity(&self, limit: u32) -> Result<Vec<LicenseActivity>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables
            .activity
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl JobRepository for InMemoryStore {
    async fn get_job(&self, id: JobId) -> Result<Option<Job>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables.jobs.get(&id).cloned())
    }

    async fn insert_job(&self, job: &Job) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        if tables.jobs.contains_key(&job.id) {
            return Err(CoreError::Conflict(format!("job {} already exists", job.id)));
        }
        tables.jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn update_job(&self, job: &Job) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;
        match tables.jobs.get_mut(&job.id) {
            Some(stored) => {
                *stored = job.clone();
                Ok(())
            }
            None => Err(CoreError::NotFound(format!("job {}", job.id))),
        }
    }

    async fn list_non_basic_jobs(&self) -> Result<Vec<Job>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        let mut jobs: Vec<Job> = tables
            .jobs
            .values()
            .filter(|job| !job.tier_required.is_basic())
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    async fn apply_downgrade(&self, plans: &[DowngradePlan]) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.check_available()?;

        if tables.faults.failing_downgrades > 0 {
            tables.faults.failing_downgrades -= 1;
            return Err(CoreError::Database(
                "downgrade batch aborted".into(),
            ));
        }
        if tables.faults.conflicting_downgrades > 0 {
            tables.faults.conflicting_downgrades -= 1;
            return Err(CoreError::Conflict(
                "jobs changed while downgrading".into(),
            ));
        }

        // Validate the whole batch before touching anything.
        for plan in plans {
            let current = tables.jobs.get(&plan.job.id).ok_or_else(|| {
                CoreError::Conflict(format!("job {} disappeared", plan.job.id))
            })?;
            if current.updated_at != plan.expected_updated_at {
                return Err(CoreError::Conflict(format!(
                    "job {} changed while downgrading",
                    plan.job.id
                )));
            }
        }

        for plan in plans {
            tables.backups.push(plan.backup.clone());
            tables.jobs.insert(plan.job.id, plan.job.clone());
        }
        Ok(())
    }

    async fn latest_backup(&self, job_id: JobId) -> Result<Option<JobBackup>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        Ok(tables
            .backups
            .iter()
            .filter(|backup| backup.job_id == job_id)
            .max_by_key(|backup| (backup.created_at, backup.id))
            .cloned())
    }

    async fn list_backups(&self, job_id: Option<JobId>) -> Result<Vec<JobBackup>> {
        let tables = self.tables.lock().await;
        tables.check_available()?;
        let mut backups: Vec<JobBackup> = tables
            .backups
            .iter()
            .filter(|backup| job_id.is_none_or(|job_id| backup.job_id == job_id))
            .cloned()
            .collect();
        backups.sort_by(|a, b| {
            b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
        });
        Ok(backups)
    }
}

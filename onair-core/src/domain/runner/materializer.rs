use std::sync::Arc;

use chrono::{DateTime, Utc};
use onair_model::{Schedule, Session};
use tracing::{debug, info, warn};

use crate::database::repository_ports::{ScheduleRepository, SessionRepository};
use crate::error::Result;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaterializeReport {
    pub eligible: usize,
    pub created: usize,
    pub failed: usize,
}

/// Turns eligible schedules into queued sessions, at most one active session
/// per schedule.
#[derive(Clone)]
pub struct ScheduleMaterializer {
    schedules: Arc<dyn ScheduleRepository>,
    sessions: Arc<dyn SessionRepository>,
}

impl std::fmt::Debug for ScheduleMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleMaterializer").finish_non_exhaustive()
    }
}

impl ScheduleMaterializer {
    pub fn new(
        schedules: Arc<dyn ScheduleRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self {
            schedules,
            sessions,
        }
    }

    /// Enabled schedules with `start_at <= now`.
    ///
    /// Schedules past their `end_at` stay eligible; they keep producing a
    /// session whenever none is active until someone disables them.
    pub async fn eligible(&self, now: DateTime<Utc>) -> Result<Vec<Schedule>> {
        self.schedules.eligible_schedules(now).await
    }

    /// Queue a session for `schedule` unless one is already queued, starting
    /// or running. Returns the new session, or `None` when nothing was done.
    pub async fn ensure_session(
        &self,
        schedule: &Schedule,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>> {
        if self.sessions.has_active_session(schedule.id).await? {
            return Ok(None);
        }

        let session = Session::from_schedule(schedule, now)?;
        if !self.sessions.insert_session(&session).await? {
            debug!(schedule_id = %schedule.id, "active session appeared concurrently");
            return Ok(None);
        }

        info!(
            schedule_id = %schedule.id,
            job_id = %schedule.job_id,
            session_id = %session.id,
            "queued scheduled session"
        );
        Ok(Some(session))
    }

    /// One pass over every eligible schedule. A failure on one schedule is
    /// logged and does not stop the pass.
    pub async fn materialize(&self, now: DateTime<Utc>) -> Result<MaterializeReport> {
        let eligible = self.eligible(now).await?;
        let mut report = MaterializeReport {
            eligible: eligible.len(),
            ..MaterializeReport::default()
        };

        for schedule in &eligible {
            match self.ensure_session(schedule, now).await {
                Ok(Some(_)) => report.created += 1,
                Ok(None) => {}
                Err(err) => {
                    report.failed += 1;
                    warn!(schedule_id = %schedule.id, "failed to materialize schedule: {err}");
                }
            }
        }

        Ok(report)
    }
}

use std::sync::Arc;

use onair_model::{JobId, NewSchedule, Schedule, Session};
use tracing::info;

use crate::{
    clock::Clock,
    database::repository_ports::{
        JobRepository, ScheduleRepository, SessionRepository,
    },
    error::CoreError,
};

use super::error::{ScheduleError, SessionError};

/// Admission of schedules and manual "run now" sessions.
#[derive(Clone)]
pub struct SessionService {
    jobs: Arc<dyn JobRepository>,
    schedules: Arc<dyn ScheduleRepository>,
    sessions: Arc<dyn SessionRepository>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionService").finish_non_exhaustive()
    }
}

impl SessionService {
    pub fn new(
        jobs: Arc<dyn JobRepository>,
        schedules: Arc<dyn ScheduleRepository>,
        sessions: Arc<dyn SessionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            jobs,
            schedules,
            sessions,
            clock,
        }
    }

    /// Queue a session for `job_id` starting now.
    pub async fn run_now(&self, job_id: JobId) -> Result<Session, SessionError> {
        if self.jobs.get_job(job_id).await?.is_none() {
            return Err(SessionError::JobNotFound(job_id));
        }

        let session = Session::run_now(job_id, self.clock.now());
        if !self.sessions.insert_session(&session).await? {
            return Err(CoreError::Conflict(format!(
                "session {} was not stored",
                session.id
            ))
            .into());
        }

        info!(job_id = %job_id, session_id = %session.id, "queued run-now session");
        Ok(session)
    }

    /// Validate and store a schedule.
    ///
    /// A schedule with neither `end_at` nor `duration_s` runs until stopped,
    /// which is only allowed for looping jobs.
    pub async fn create_schedule(
        &self,
        request: NewSchedule,
    ) -> Result<Schedule, ScheduleError> {
        let job = self
            .jobs
            .get_job(request.job_id)
            .await?
            .ok_or(ScheduleError::JobNotFound(request.job_id))?;

        if let Some(duration_s) = request.duration_s
            && duration_s <= 0
        {
            return Err(ScheduleError::InvalidDuration(duration_s));
        }
        if let Some(end_at) = request.end_at
            && end_at <= request.start_at
        {
            return Err(ScheduleError::EndBeforeStart);
        }

        let schedule = request.into_schedule();
        if let Some(duration_s) = schedule.duration_s
            && schedule.planned_end_at().is_err()
        {
            return Err(ScheduleError::DurationOutOfRange(duration_s));
        }
        if schedule.is_open_ended() && !job.loop_enabled {
            return Err(ScheduleError::OpenEndedRequiresLoop);
        }

        self.schedules.insert_schedule(&schedule).await?;
        info!(schedule_id = %schedule.id, job_id = %schedule.job_id, "schedule created");
        Ok(schedule)
    }

    pub async fn list_sessions(
        &self,
        job_id: Option<JobId>,
    ) -> Result<Vec<Session>, SessionError> {
        Ok(self.sessions.list_sessions(job_id).await?)
    }
}

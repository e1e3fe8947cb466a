use async_trait::async_trait;
use onair_model::{JobId, ScheduleId, Session, SessionId, SessionState};

use crate::error::Result;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Whether a queued, starting, or running session exists for the schedule.
    async fn has_active_session(&self, schedule_id: ScheduleId) -> Result<bool>;

    /// Insert a session. Scheduled sessions are rejected when an active
    /// session for the same schedule already exists, in which case `false`
    /// is returned and nothing is written.
    async fn insert_session(&self, session: &Session) -> Result<bool>;

    /// Sessions newest first, optionally restricted to one job.
    async fn list_sessions(&self, job_id: Option<JobId>) -> Result<Vec<Session>>;

    /// State transition hook for the media executor.
    async fn update_session_state(
        &self,
        id: SessionId,
        state: SessionState,
    ) -> Result<bool>;
}

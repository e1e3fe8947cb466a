use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::ModelError,
    ids::{JobId, ScheduleId, SessionId},
    schedule::Schedule,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionTrigger {
    RunNow,
    Schedule,
}

impl SessionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionTrigger::RunNow => "run_now",
            SessionTrigger::Schedule => "schedule",
        }
    }
}

impl FromStr for SessionTrigger {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run_now" => Ok(SessionTrigger::RunNow),
            "schedule" => Ok(SessionTrigger::Schedule),
            other => Err(ModelError::unknown("session trigger", other)),
        }
    }
}

/// Lifecycle of an execution session. Transitions past `queued` belong to the
/// media executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Queued,
    Starting,
    Running,
    Stopped,
    Failed,
}

impl SessionState {
    pub const ACTIVE: [SessionState; 3] = [
        SessionState::Queued,
        SessionState::Starting,
        SessionState::Running,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Queued => "queued",
            SessionState::Starting => "starting",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }
}

impl FromStr for SessionState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(SessionState::Queued),
            "starting" => Ok(SessionState::Starting),
            "running" => Ok(SessionState::Running),
            "stopped" => Ok(SessionState::Stopped),
            "failed" => Ok(SessionState::Failed),
            other => Err(ModelError::unknown("session state", other)),
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub job_id: JobId,
    pub schedule_id: Option<ScheduleId>,
    pub trigger: SessionTrigger,
    pub state: SessionState,
    pub planned_start_at: DateTime<Utc>,
    pub planned_end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Queued session for one occurrence of `schedule`.
    pub fn from_schedule(
        schedule: &Schedule,
        now: DateTime<Utc>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            id: SessionId::new(),
            job_id: schedule.job_id,
            schedule_id: Some(schedule.id),
            trigger: SessionTrigger::Schedule,
            state: SessionState::Queued,
            planned_start_at: schedule.start_at,
            planned_end_at: schedule.planned_end_at()?,
            created_at: now,
        })
    }

    /// Queued session started manually, planned for `now`.
    pub fn run_now(job_id: JobId, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            job_id,
            schedule_id: None,
            trigger: SessionTrigger::RunNow,
            state: SessionState::Queued,
            planned_start_at: now,
            planned_end_at: None,
            created_at: now,
        }
    }
}

use onair_model::JobId;
use thiserror::Error;

use crate::error::CoreError;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("open-ended schedules require the job to have looping enabled")]
    OpenEndedRequiresLoop,

    #[error("duration_s must be positive, got {0}")]
    InvalidDuration(i64),

    #[error("duration_s {0} puts the end of the schedule out of range")]
    DurationOutOfRange(i64),

    #[error("end_at must be after start_at")]
    EndBeforeStart,

    #[error(transparent)]
    Storage(#[from] CoreError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error(transparent)]
    Storage(#[from] CoreError),
}

use onair_model::JobId;
use thiserror::Error;

use crate::error::CoreError;

#[derive(Debug, Error)]
pub enum DowngradeError {
    #[error("no backup found for job {0}")]
    NoBackupFound(JobId),

    #[error("job {0} not found")]
    JobNotFound(JobId),

    #[error("jobs kept changing during downgrade; gave up after {attempts} attempts")]
    ConcurrentModification { attempts: u32 },

    #[error("backup snapshot could not be decoded: {0}")]
    Snapshot(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] CoreError),
}

use std::{any::type_name_of_val, fmt, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use onair_model::RunnerLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    database::repository_ports::RunnerLockRepository, error::CoreError,
};

use super::config::TakeoverMode;

#[derive(Debug, Error)]
pub enum LockError {
    /// Storage could not be reached. Transient; retried on the next cycle.
    #[error("runner lock unavailable: {0}")]
    LockUnavailable(#[from] CoreError),
}

/// Result of one acquisition attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    /// The slot was empty and is now ours.
    Acquired,
    /// We already hold a fresh lock.
    Held,
    /// The previous holder went stale and we replaced it.
    TakenOver { previous: RunnerLock },
    /// Someone else holds a fresh lock, or won the takeover race.
    HeldByOther { holder: String },
}

impl LockOutcome {
    pub fn is_leader(&self) -> bool {
        !matches!(self, LockOutcome::HeldByOther { .. })
    }
}

/// Heartbeat-based single-leader election over the singleton lock row.
pub struct LockManager<R>
where
    R: RunnerLockRepository + ?Sized,
{
    repository: Arc<R>,
    runner_id: String,
    heartbeat_interval: Duration,
    takeover: TakeoverMode,
}

impl<R> fmt::Debug for LockManager<R>
where
    R: RunnerLockRepository + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockManager")
            .field("repository", &type_name_of_val(self.repository.as_ref()))
            .field("runner_id", &self.runner_id)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("takeover", &self.takeover)
            .finish()
    }
}

impl<R> LockManager<R>
where
    R: RunnerLockRepository + ?Sized,
{
    pub fn new(
        repository: Arc<R>,
        runner_id: impl Into<String>,
        heartbeat_interval: std::time::Duration,
    ) -> Self {
        Self {
            repository,
            runner_id: runner_id.into(),
            heartbeat_interval: Duration::from_std(heartbeat_interval)
                .unwrap_or(Duration::MAX),
            takeover: TakeoverMode::default(),
        }
    }

    pub fn with_takeover(mut self, takeover: TakeoverMode) -> Self {
        self.takeover = takeover;
        self
    }

    pub fn runner_id(&self) -> &str {
        &self.runner_id
    }

    /// `true` iff this runner may act as leader. Storage failures count as
    /// "not acquired" and are logged.
    pub async fn acquire(&self, now: DateTime<Utc>) -> bool {
        match self.try_acquire(now).await {
            Ok(outcome) => outcome.is_leader(),
            Err(err) => {
                warn!(runner_id = %self.runner_id, "lock acquisition failed: {err}");
                false
            }
        }
    }

    pub async fn try_acquire(
        &self,
        now: DateTime<Utc>,
    ) -> Result<LockOutcome, LockError> {
        let mine = RunnerLock::new(self.runner_id.clone(), now);

        let Some(current) = self.repository.get().await? else {
            return self.claim_empty(&mine).await;
        };

        if current.is_stale(now, self.heartbeat_interval) {
            return self.take_over(current, &mine).await;
        }

        if current.is_held_by(&self.runner_id) {
            Ok(LockOutcome::Held)
        } else {
            Ok(LockOutcome::HeldByOther {
                holder: current.runner_id,
            })
        }
    }

    /// Renew the heartbeat. A no-op returning `false` unless we own the row.
    pub async fn heartbeat(&self, now: DateTime<Utc>) -> Result<bool, LockError> {
        let renewed = self.repository.touch(&self.runner_id, now).await?;
        if !renewed {
            debug!(runner_id = %self.runner_id, "heartbeat skipped; lock not held");
        }
        Ok(renewed)
    }

    async fn claim_empty(
        &self,
        mine: &RunnerLock,
    ) -> Result<LockOutcome, LockError> {
        match self.takeover {
            TakeoverMode::Legacy => {
                self.repository.overwrite(mine).await?;
            }
            TakeoverMode::Atomic => {
                if !self.repository.insert_if_absent(mine).await? {
                    return self.observed_loss().await;
                }
            }
        }
        info!(runner_id = %self.runner_id, "runner lock acquired");
        Ok(LockOutcome::Acquired)
    }

    async fn take_over(
        &self,
        previous: RunnerLock,
        mine: &RunnerLock,
    ) -> Result<LockOutcome, LockError> {
        match self.takeover {
            TakeoverMode::Legacy => {
                self.repository.overwrite(mine).await?;
            }
            TakeoverMode::Atomic => {
                if !self.repository.compare_and_swap(&previous, mine).await? {
                    return self.observed_loss().await;
                }
            }
        }
        info!(
            runner_id = %self.runner_id,
            previous = %previous.runner_id,
            "took over stale runner lock"
        );
        Ok(LockOutcome::TakenOver { previous })
    }

    /// A conditional write lost; report whoever holds the row now.
    async fn observed_loss(&self) -> Result<LockOutcome, LockError> {
        match self.repository.get().await? {
            Some(lock) if lock.is_held_by(&self.runner_id) => Ok(LockOutcome::Held),
            Some(lock) => {
                debug!(
                    runner_id = %self.runner_id,
                    holder = %lock.runner_id,
                    "lost runner lock race"
                );
                Ok(LockOutcome::HeldByOther {
                    holder: lock.runner_id,
                })
            }
            // The winner vanished again; try on the next cycle.
            None => Ok(LockOutcome::HeldByOther {
                holder: String::new(),
            }),
        }
    }
}

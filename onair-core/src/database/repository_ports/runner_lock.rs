use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::RunnerLock;

use crate::error::Result;

/// Storage for the singleton leader-election row.
#[async_trait]
pub trait RunnerLockRepository: Send + Sync {
    async fn get(&self) -> Result<Option<RunnerLock>>;

    /// Unconditionally write `lock` into the slot.
    async fn overwrite(&self, lock: &RunnerLock) -> Result<()>;

    /// Write `lock` only when the slot is empty. Returns `true` when written.
    async fn insert_if_absent(&self, lock: &RunnerLock) -> Result<bool>;

    /// Replace the row only if it still equals `expected` (holder and
    /// heartbeat). Returns `true` when the swap happened.
    async fn compare_and_swap(
        &self,
        expected: &RunnerLock,
        next: &RunnerLock,
    ) -> Result<bool>;

    /// Refresh `heartbeat_at` when `runner_id` holds the slot. Returns `true`
    /// when a row was updated.
    async fn touch(&self, runner_id: &str, at: DateTime<Utc>) -> Result<bool>;
}

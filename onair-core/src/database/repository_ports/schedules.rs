use async_trait::async_trait;
use chrono::{DateTime, Utc};
use onair_model::{Schedule, ScheduleId};

use crate::error::Result;

#[async_trait]
pub trait ScheduleRepository: Send + Sync {
    async fn insert_schedule(&self, schedule: &Schedule) -> Result<()>;

    async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>>;

    /// Enabled schedules whose `start_at` is at or before `now`.
    ///
    /// `end_at` is not consulted.
    async fn eligible_schedules(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Schedule>>;
}

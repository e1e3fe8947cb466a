use std::{future::Future, sync::Arc, time::Duration};

use tracing::{debug, info, warn};

use crate::{
    application::AppUnitOfWork,
    clock::Clock,
    database::repository_ports::RunnerLockRepository,
};

use super::{
    config::RunnerSettings,
    lock::LockManager,
    materializer::{MaterializeReport, ScheduleMaterializer},
};

/// What one poll cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub leader: bool,
    pub heartbeat_renewed: bool,
    pub materialized: MaterializeReport,
}

/// Periodic runner task: acquire, heartbeat, materialize.
#[derive(Debug)]
pub struct RunnerPoller {
    lock: LockManager<dyn RunnerLockRepository>,
    materializer: ScheduleMaterializer,
    clock: Arc<dyn Clock>,
    settings: RunnerSettings,
}

impl RunnerPoller {
    pub fn new(
        uow: &AppUnitOfWork,
        clock: Arc<dyn Clock>,
        settings: RunnerSettings,
    ) -> Self {
        let lock = LockManager::new(
            uow.runner_lock.clone(),
            settings.runner_id.clone(),
            settings.heartbeat_interval,
        )
        .with_takeover(settings.takeover);
        let materializer =
            ScheduleMaterializer::new(uow.schedules.clone(), uow.sessions.clone());

        Self {
            lock,
            materializer,
            clock,
            settings,
        }
    }

    pub fn lock_manager(&self) -> &LockManager<dyn RunnerLockRepository> {
        &self.lock
    }

    /// Run one cycle. Storage failures are logged and leave the report
    /// partially filled; they never escape.
    pub async fn tick(&self) -> TickReport {
        let now = self.clock.now();
        let mut report = TickReport::default();

        if !self.lock.acquire(now).await {
            debug!(runner_id = %self.settings.runner_id, "standing by");
            return report;
        }
        report.leader = true;

        match self.lock.heartbeat(now).await {
            Ok(renewed) => report.heartbeat_renewed = renewed,
            Err(err) => warn!(runner_id = %self.settings.runner_id, "heartbeat failed: {err}"),
        }

        match self.materializer.materialize(now).await {
            Ok(materialized) => {
                if materialized.created > 0 {
                    info!(
                        runner_id = %self.settings.runner_id,
                        sessions = materialized.created,
                        "materialized scheduled sessions"
                    );
                }
                report.materialized = materialized;
            }
            Err(err) => {
                warn!(runner_id = %self.settings.runner_id, "schedule scan failed: {err}");
            }
        }

        report
    }

    /// Delay before the next cycle: leaders pace on the heartbeat interval,
    /// standbys poll faster so they notice a stale leader promptly.
    pub fn next_delay(&self, report: &TickReport) -> Duration {
        if report.leader {
            self.settings.heartbeat_interval
        } else {
            self.settings.standby_poll_interval
        }
    }

    /// Poll until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            runner_id = %self.settings.runner_id,
            takeover = ?self.settings.takeover,
            "runner started"
        );

        loop {
            let report = self.tick().await;
            let delay = self.next_delay(&report);
            tokio::select! {
                _ = &mut shutdown => {
                    info!(runner_id = %self.settings.runner_id, "runner shutting down");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::ManualClock,
        database::{InMemoryStore, repository_ports::{JobRepository, ScheduleRepository}},
    };
    use chrono::{Duration as ChronoDuration, Utc};
    use onair_model::{Job, NewSchedule};
    use uuid::Uuid;

    #[tokio::test]
    async fn only_the_leader_materializes() {
        let store = Arc::new(InMemoryStore::new());
        let uow = AppUnitOfWork::in_memory(store.clone());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let now = clock.now();

        let job = Job::new("Lobby", Uuid::new_v4(), Uuid::new_v4(), now);
        store.insert_job(&job).await.unwrap();
        let schedule = NewSchedule {
            job_id: job.id,
            kind: Default::default(),
            start_at: now - ChronoDuration::minutes(1),
            end_at: None,
            duration_s: Some(600),
            retry_policy: None,
            enabled: true,
        }
        .into_schedule();
        store.insert_schedule(&schedule).await.unwrap();

        let leader = RunnerPoller::new(&uow, clock.clone(), RunnerSettings::new("a"));
        let standby = RunnerPoller::new(&uow, clock.clone(), RunnerSettings::new("b"));

        let first = leader.tick().await;
        assert!(first.leader);
        assert!(first.heartbeat_renewed);
        assert_eq!(first.materialized.created, 1);
        assert_eq!(leader.next_delay(&first), std::time::Duration::from_secs(30));

        let other = standby.tick().await;
        assert!(!other.leader);
        assert_eq!(standby.next_delay(&other), std::time::Duration::from_secs(5));

        let again = leader.tick().await;
        assert_eq!(again.materialized.created, 0);
        assert_eq!(again.materialized.eligible, 1);
    }

    #[tokio::test]
    async fn storage_outage_does_not_escape_tick() {
        let store = Arc::new(InMemoryStore::new());
        let uow = AppUnitOfWork::in_memory(store.clone());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let poller = RunnerPoller::new(&uow, clock, RunnerSettings::new("a"));

        store.set_unavailable(true).await;
        assert_eq!(poller.tick().await, TickReport::default());

        store.set_unavailable(false).await;
        assert!(poller.tick().await.leader);
    }

    #[tokio::test]
    async fn run_until_stops_on_shutdown() {
        let store = Arc::new(InMemoryStore::new());
        let uow = AppUnitOfWork::in_memory(store);
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let poller = RunnerPoller::new(&uow, clock, RunnerSettings::new("a"));

        poller.run_until(std::future::ready(())).await;
    }
}

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, TimeZone, Utc};
use onair_core::{
    AppUnitOfWork, ManualClock,
    database::{
        InMemoryStore,
        repository_ports::{JobRepository, ScheduleRepository, SessionRepository},
    },
    domain::runner::{RunnerPoller, RunnerSettings, TakeoverMode},
    domain::sessions::SessionService,
};
use onair_model::{Job, NewSchedule, ScheduleId, SessionState};
use uuid::Uuid;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
}

async fn active_per_schedule(store: &InMemoryStore) -> HashMap<ScheduleId, usize> {
    let mut counts = HashMap::new();
    for session in store.list_sessions(None).await.unwrap() {
        if let Some(schedule_id) = session.schedule_id
            && session.state.is_active()
        {
            *counts.entry(schedule_id).or_default() += 1;
        }
    }
    counts
}

#[tokio::test]
async fn competing_runners_never_exceed_one_active_session_per_schedule() {
    let store = Arc::new(InMemoryStore::new());
    let uow = AppUnitOfWork::in_memory(store.clone());
    let clock = Arc::new(ManualClock::new(t0()));

    let job = Job::new("Lobby", Uuid::new_v4(), Uuid::new_v4(), t0());
    store.insert_job(&job).await.unwrap();
    let service = SessionService::new(
        uow.jobs.clone(),
        uow.schedules.clone(),
        uow.sessions.clone(),
        clock.clone(),
    );
    for offset in [1, 2, 3] {
        service
            .create_schedule(NewSchedule {
                job_id: job.id,
                kind: Default::default(),
                start_at: t0() - Duration::minutes(offset),
                end_at: None,
                duration_s: Some(900),
                retry_policy: None,
                enabled: true,
            })
            .await
            .unwrap();
    }

    let runners: Vec<RunnerPoller> = ["a", "b", "c"]
        .into_iter()
        .map(|id| {
            RunnerPoller::new(
                &uow,
                clock.clone(),
                RunnerSettings::new(id).with_takeover(TakeoverMode::Legacy),
            )
        })
        .collect();

    for round in 0..20 {
        // Leader heartbeats lapse every few rounds so leadership moves around.
        clock.advance(Duration::seconds(if round % 4 == 3 { 45 } else { 10 }));
        let (x, y, z) = tokio::join!(runners[0].tick(), runners[1].tick(), runners[2].tick());
        assert!([x, y, z].iter().any(|report| report.leader));

        for count in active_per_schedule(&store).await.values() {
            assert_eq!(*count, 1);
        }

        // Finish one session now and then so new ones get materialized.
        if round % 5 == 4
            && round < 19
            && let Some(session) = store
                .list_sessions(None)
                .await
                .unwrap()
                .into_iter()
                .find(|session| session.state.is_active())
        {
            store
                .update_session_state(session.id, SessionState::Stopped)
                .await
                .unwrap();
        }
    }

    assert_eq!(active_per_schedule(&store).await.len(), 3);
}

#[tokio::test]
async fn run_now_sessions_do_not_block_scheduled_ones() {
    let store = Arc::new(InMemoryStore::new());
    let uow = AppUnitOfWork::in_memory(store.clone());
    let clock = Arc::new(ManualClock::new(t0()));

    let mut job = Job::new("Loop", Uuid::new_v4(), Uuid::new_v4(), t0());
    job.loop_enabled = true;
    store.insert_job(&job).await.unwrap();

    let service = SessionService::new(
        uow.jobs.clone(),
        uow.schedules.clone(),
        uow.sessions.clone(),
        clock.clone(),
    );
    service.run_now(job.id).await.unwrap();
    service
        .create_schedule(NewSchedule {
            job_id: job.id,
            kind: Default::default(),
            start_at: t0(),
            end_at: None,
            duration_s: None,
            retry_policy: None,
            enabled: true,
        })
        .await
        .unwrap();

    let poller = RunnerPoller::new(&uow, clock.clone(), RunnerSettings::new("solo"));
    let report = poller.tick().await;
    assert_eq!(report.materialized.created, 1);
    assert_eq!(service.list_sessions(Some(job.id)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn leader_survives_a_schedule_with_an_unrepresentable_end() {
    let store = Arc::new(InMemoryStore::new());
    let uow = AppUnitOfWork::in_memory(store.clone());
    let clock = Arc::new(ManualClock::new(t0()));

    let job = Job::new("Lobby", Uuid::new_v4(), Uuid::new_v4(), t0());
    store.insert_job(&job).await.unwrap();
    let broken = NewSchedule {
        job_id: job.id,
        kind: Default::default(),
        start_at: t0() - Duration::minutes(1),
        end_at: None,
        duration_s: Some(i64::MAX),
        retry_policy: None,
        enabled: true,
    }
    .into_schedule();
    // Written straight to storage, as a row predating admission checks would be.
    store.insert_schedule(&broken).await.unwrap();

    let poller = RunnerPoller::new(&uow, clock.clone(), RunnerSettings::new("solo"));
    for _ in 0..3 {
        let report = poller.tick().await;
        assert!(report.leader);
        assert_eq!(report.materialized.failed, 1);
        assert_eq!(report.materialized.created, 0);
        clock.advance(Duration::seconds(10));
    }
    assert!(store.list_sessions(None).await.unwrap().is_empty());
}

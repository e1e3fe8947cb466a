use std::sync::Arc;

use axum_test::TestServer;
use chrono::{DateTime, TimeZone, Utc};
use onair_core::{
    AppUnitOfWork, ManualClock, SecretHasher,
    database::{InMemoryStore, repository_ports::JobRepository},
    domain::license::LicensePolicy,
};
use onair_model::{AudioMode, HotSwapMode, Job, JobStatus, Tier};
use onair_server::{AppState, build_app, cors_layer};
use uuid::Uuid;

// Code is used by test modules, but not in this scope
#[allow(unused)]
pub struct TestApp {
    pub server: TestServer,
    pub store: Arc<InMemoryStore>,
    pub clock: Arc<ManualClock>,
}

#[allow(unused)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
}

#[allow(unused)]
pub fn build_test_app() -> TestApp {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(t0()));
    let hasher = SecretHasher::new("test-license-key").unwrap();

    let state = AppState::new(
        AppUnitOfWork::in_memory(store.clone()),
        clock.clone(),
        hasher,
        LicensePolicy::default(),
    );
    let server = TestServer::new(build_app(state, cors_layer(&[]).unwrap())).unwrap();

    TestApp {
        server,
        store,
        clock,
    }
}

#[allow(unused)]
pub async fn seed_premium_job(store: &InMemoryStore, now: DateTime<Utc>) -> Job {
    let mut job = Job::new("Evening show", Uuid::new_v4(), Uuid::new_v4(), now);
    job.tier_required = Tier::Premium;
    job.audio_mode = AudioMode::Mix;
    job.audio_asset_id = Some(Uuid::new_v4());
    job.auto_recovery = true;
    job.hot_swap_mode = HotSwapMode::EndOfLoop;
    job.status = JobStatus::Valid;
    store.insert_job(&job).await.unwrap();
    job
}

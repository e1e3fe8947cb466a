//! Two runners that both observe the same stale lock.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use onair_core::{
    Result,
    database::{InMemoryStore, repository_ports::RunnerLockRepository},
    domain::runner::{LockManager, LockOutcome, TakeoverMode},
};
use onair_model::RunnerLock;
use tokio::sync::Barrier;

/// Holds the first two reads at a barrier so both callers decide from the
/// same snapshot, and records the order of unconditional writes.
struct RacingLockRepository {
    inner: InMemoryStore,
    gated_reads: AtomicUsize,
    barrier: Barrier,
    writes: Mutex<Vec<String>>,
}

impl RacingLockRepository {
    fn new() -> Self {
        Self {
            inner: InMemoryStore::new(),
            gated_reads: AtomicUsize::new(2),
            barrier: Barrier::new(2),
            writes: Mutex::new(Vec::new()),
        }
    }

    fn last_writer(&self) -> Option<String> {
        self.writes.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl RunnerLockRepository for RacingLockRepository {
    async fn get(&self) -> Result<Option<RunnerLock>> {
        let lock = self.inner.get().await?;
        let gated = self
            .gated_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if gated {
            self.barrier.wait().await;
        }
        Ok(lock)
    }

    async fn overwrite(&self, lock: &RunnerLock) -> Result<()> {
        self.inner.overwrite(lock).await?;
        self.writes.lock().unwrap().push(lock.runner_id.clone());
        Ok(())
    }

    async fn insert_if_absent(&self, lock: &RunnerLock) -> Result<bool> {
        self.inner.insert_if_absent(lock).await
    }

    async fn compare_and_swap(
        &self,
        expected: &RunnerLock,
        next: &RunnerLock,
    ) -> Result<bool> {
        self.inner.compare_and_swap(expected, next).await
    }

    async fn touch(&self, runner_id: &str, at: DateTime<Utc>) -> Result<bool> {
        self.inner.touch(runner_id, at).await
    }
}

const HEARTBEAT: std::time::Duration = std::time::Duration::from_secs(30);

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
}

async fn stale_repository() -> Arc<RacingLockRepository> {
    let repo = Arc::new(RacingLockRepository::new());
    repo.inner
        .overwrite(&RunnerLock::new("crashed", t0()))
        .await
        .unwrap();
    repo
}

fn managers(
    repo: &Arc<RacingLockRepository>,
    takeover: TakeoverMode,
) -> (LockManager<RacingLockRepository>, LockManager<RacingLockRepository>) {
    (
        LockManager::new(repo.clone(), "runner-a", HEARTBEAT).with_takeover(takeover),
        LockManager::new(repo.clone(), "runner-b", HEARTBEAT).with_takeover(takeover),
    )
}

#[tokio::test]
async fn legacy_takeover_race_converges_on_last_writer() {
    let repo = stale_repository().await;
    let (a, b) = managers(&repo, TakeoverMode::Legacy);
    let now = t0() + Duration::minutes(2);

    let (first, second) = tokio::join!(a.try_acquire(now), b.try_acquire(now));
    let (first, second) = (first.unwrap(), second.unwrap());

    // Mid-race exclusivity is not guaranteed: both believe they took over.
    assert!(matches!(first, LockOutcome::TakenOver { .. }));
    assert!(matches!(second, LockOutcome::TakenOver { .. }));

    let holder = repo.get().await.unwrap().unwrap().runner_id;
    assert_eq!(Some(holder.clone()), repo.last_writer());

    // The next cycle settles on exactly one leader, the last writer.
    let later = now + Duration::seconds(5);
    let a_leads = a.acquire(later).await;
    let b_leads = b.acquire(later).await;
    assert!(a_leads ^ b_leads);
    assert_eq!(a_leads, holder == "runner-a");
}

#[tokio::test]
async fn atomic_takeover_race_has_a_single_winner() {
    let repo = stale_repository().await;
    let (a, b) = managers(&repo, TakeoverMode::Atomic);
    let now = t0() + Duration::minutes(2);

    let (first, second) = tokio::join!(a.try_acquire(now), b.try_acquire(now));
    let (first, second) = (first.unwrap(), second.unwrap());

    let winners = [&first, &second]
        .iter()
        .filter(|outcome| matches!(outcome, LockOutcome::TakenOver { .. }))
        .count();
    assert_eq!(winners, 1);
    assert!(first.is_leader() ^ second.is_leader());

    let holder = repo.get().await.unwrap().unwrap().runner_id;
    let expected = if first.is_leader() { "runner-a" } else { "runner-b" };
    assert_eq!(holder, expected);
    assert!(repo.last_writer().is_none());
}

#[tokio::test]
async fn heartbeat_keeps_a_live_leader_in_place() {
    let store = Arc::new(InMemoryStore::new());
    let a = LockManager::new(store.clone(), "runner-a", HEARTBEAT);
    let b = LockManager::new(store.clone(), "runner-b", HEARTBEAT);

    assert!(a.acquire(t0()).await);
    for step in 1..=10 {
        let now = t0() + Duration::seconds(25 * step);
        assert!(a.heartbeat(now).await.unwrap());
        assert!(!b.acquire(now).await);
    }

    // Leader stops heartbeating; the standby takes over once strictly stale.
    let last = t0() + Duration::seconds(250);
    assert!(!b.acquire(last + Duration::seconds(30)).await);
    assert!(b.acquire(last + Duration::seconds(31)).await);
    assert!(!a.heartbeat(last + Duration::seconds(31)).await.unwrap());
}

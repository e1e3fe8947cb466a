use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The single leader-election row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerLock {
    pub runner_id: String,
    pub heartbeat_at: DateTime<Utc>,
}

impl RunnerLock {
    pub fn new(runner_id: impl Into<String>, heartbeat_at: DateTime<Utc>) -> Self {
        Self {
            runner_id: runner_id.into(),
            heartbeat_at,
        }
    }

    /// Stale once strictly more than `interval` has passed since the last heartbeat.
    pub fn is_stale(&self, now: DateTime<Utc>, interval: Duration) -> bool {
        now - self.heartbeat_at > interval
    }

    pub fn is_held_by(&self, runner_id: &str) -> bool {
        self.runner_id == runner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staleness_is_strict() {
        let now = Utc::now();
        let lock = RunnerLock::new("a", now - Duration::seconds(30));
        assert!(!lock.is_stale(now, Duration::seconds(30)));
        assert!(lock.is_stale(now + Duration::milliseconds(1), Duration::seconds(30)));
    }
}

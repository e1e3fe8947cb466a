use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_STANDBY_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// How a stale lock is taken over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TakeoverMode {
    /// Conditional update that only succeeds if the row still holds the
    /// previously observed holder and heartbeat.
    #[default]
    Atomic,
    /// Read-then-overwrite. Two runners observing the same stale row can
    /// both win; the last write decides the final holder.
    Legacy,
}

impl std::str::FromStr for TakeoverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(TakeoverMode::Atomic),
            "legacy" => Ok(TakeoverMode::Legacy),
            other => Err(format!("unknown takeover mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    pub runner_id: String,
    pub heartbeat_interval: Duration,
    pub standby_poll_interval: Duration,
    pub takeover: TakeoverMode,
}

impl RunnerSettings {
    pub fn new(runner_id: impl Into<String>) -> Self {
        Self {
            runner_id: runner_id.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            standby_poll_interval: DEFAULT_STANDBY_POLL_INTERVAL,
            takeover: TakeoverMode::default(),
        }
    }

    pub fn with_takeover(mut self, takeover: TakeoverMode) -> Self {
        self.takeover = takeover;
        self
    }

    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

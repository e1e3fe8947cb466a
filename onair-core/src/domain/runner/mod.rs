//! Leader-elected runner: lock manager, schedule materializer, and the poll
//! loop that ties them together.

pub mod config;
pub mod lock;
pub mod materializer;
pub mod poller;

pub use config::{RunnerSettings, TakeoverMode};
pub use lock::{LockError, LockManager, LockOutcome};
pub use materializer::{MaterializeReport, ScheduleMaterializer};
pub use poller::{RunnerPoller, TickReport};

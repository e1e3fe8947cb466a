//! Data records shared across the onair crates.
#![allow(missing_docs)]

pub mod backup;
pub mod error;
pub mod ids;
pub mod job;
pub mod license;
pub mod reasons;
pub mod runner;
pub mod schedule;
pub mod session;
pub mod tier;

pub use backup::JobBackup;
pub use error::{ModelError, Result as ModelResult};
pub use ids::{
    JobBackupId, JobId, LicenseActivityId, MemberLicenseId, ScheduleId,
    SessionId,
};
pub use job::{AudioMode, HotSwapMode, Job, JobStatus};
pub use license::{
    LicenseAction, LicenseActivity, LicensePhase, LicenseState, MemberLicense,
};
pub use reasons::{InvalidReason, InvalidReasons};
pub use runner::RunnerLock;
pub use schedule::{NewSchedule, Schedule, ScheduleKind};
pub use session::{Session, SessionState, SessionTrigger};
pub use tier::{Tier, TierCounts};

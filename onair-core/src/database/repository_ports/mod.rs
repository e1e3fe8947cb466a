pub mod jobs;
pub mod licenses;
pub mod runner_lock;
pub mod schedules;
pub mod sessions;

pub use jobs::{DowngradePlan, JobRepository};
pub use licenses::LicenseRepository;
pub use runner_lock::RunnerLockRepository;
pub use schedules::ScheduleRepository;
pub use sessions::SessionRepository;

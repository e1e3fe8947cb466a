pub mod jobs;
pub mod licenses;
pub mod runner_lock;
pub mod schedules;
pub mod sessions;

pub use jobs::PostgresJobRepository;
pub use licenses::PostgresLicenseRepository;
pub use runner_lock::PostgresRunnerLockRepository;
pub use schedules::PostgresScheduleRepository;
pub use sessions::PostgresSessionRepository;
